//! Domain errors raised by selection and migration.
//!
//! Only [`ConfigurationError`] ever crosses the orchestrator boundary. The
//! per-candidate errors ([`DescriptorError`] and [`MigrationFailure`]) are
//! logged and absorbed by the selection state machine, which falls back to
//! the next candidate instead of failing.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::filter::FilterParseError;

/// The selection expression or its surrounding configuration is malformed.
///
/// Raised at construction time; an orchestrator is never built from an
/// invalid expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No selection expression was configured at all.
    #[error("a selection expression must be configured")]
    MissingExpression,

    /// The schema name before the optional filter clause is empty.
    #[error("selection expression '{expression}' has an empty schema name")]
    EmptySchemaName {
        /// Offending expression text.
        expression: String,
    },

    /// The text after `;` is not a `filter:=...` clause.
    #[error("selection expression '{expression}' has a malformed filter clause '{clause}'")]
    MalformedFilterClause {
        /// Offending expression text.
        expression: String,
        /// Trimmed text following the `;` separator.
        clause: String,
    },

    /// The filter clause is present but carries no predicate text.
    #[error("selection expression '{expression}' has an empty filter predicate")]
    EmptyPredicate {
        /// Offending expression text.
        expression: String,
    },

    /// The predicate text is not a valid attribute filter.
    #[error("selection expression '{expression}' has an invalid filter predicate: {source}")]
    InvalidPredicate {
        /// Offending expression text.
        expression: String,
        /// Underlying filter syntax error.
        #[source]
        source: FilterParseError,
    },
}

/// A matching capability lacks an attribute required for migration.
///
/// Treated as a non-match for that capability only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The attribute is absent.
    #[error("capability attribute '{attribute}' is missing")]
    MissingAttribute {
        /// Attribute key.
        attribute: String,
    },

    /// The attribute exists but is not textual.
    #[error("capability attribute '{attribute}' must be a string")]
    NotAString {
        /// Attribute key.
        attribute: String,
    },

    /// The attribute is textual but blank.
    #[error("capability attribute '{attribute}' must not be blank")]
    Blank {
        /// Attribute key.
        attribute: String,
    },
}

/// The migration engine rejected an attempt for one candidate.
///
/// Failures are cheap to clone so they can be recorded by observers while the
/// orchestrator moves on to the next candidate. The optional source is held
/// in an `Arc` to keep the type `Send + Sync`.
///
/// # Example
///
/// ```
/// use sluice_core::MigrationFailure;
///
/// let failure = MigrationFailure::new("changelog lock is held");
/// assert_eq!(failure.to_string(), "migration failed: changelog lock is held");
/// ```
#[derive(Debug, Clone, Error)]
#[error("migration failed: {message}")]
pub struct MigrationFailure {
    message: String,
    #[source]
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl MigrationFailure {
    /// Creates a failure with a message only.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a failure wrapping the engine's own error.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}
