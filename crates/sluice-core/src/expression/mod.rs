//! Selection expressions and the provider filter built from them.
//!
//! A selection expression names the schema a component wants migrated and can
//! narrow the acceptable providers with an attribute predicate:
//!
//! ```text
//! users
//! users;filter:="(&(version>=2)(!(vendor=legacy)))"
//! users;filter:=(version>=2)
//! ```
//!
//! Everything before the first `;` is the schema name. The remainder must be
//! a `filter:=` clause whose predicate is either quoted or a bare
//! parenthesised filter. Any other shape is a [`ConfigurationError`].

use std::fmt;
use std::str::FromStr;

use crate::attributes::{ATTR_SCHEMA_NAME, Attributes};
use crate::descriptor::CapabilityDescriptor;
use crate::error::ConfigurationError;
use crate::filter::Filter;

const FILTER_DIRECTIVE: &str = "filter:=";

/// Decides whether a provider's capability is an acceptable candidate.
///
/// [`SelectionExpression`] is the standard implementation; embedders can
/// supply their own to the
/// [`CandidateRegistry`](crate::registry::CandidateRegistry).
pub trait ProviderFilter: Send + Sync {
    /// Evaluates a fully-formed descriptor.
    fn matches(&self, descriptor: &CapabilityDescriptor) -> bool;

    /// Evaluates a raw attribute set before a descriptor is extracted.
    fn matches_attributes(&self, attributes: &Attributes) -> bool;
}

/// User-supplied attribute predicate of a selection expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    text: String,
    filter: Filter,
}

impl Predicate {
    /// Predicate text as configured, without surrounding quotes.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Parsed filter.
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }
}

/// Parsed selection expression: a schema name plus an optional predicate.
///
/// # Example
///
/// ```
/// use sluice_core::SelectionExpression;
///
/// let expression: SelectionExpression = "users;filter:=\"(version>=2)\"".parse()?;
/// assert_eq!(expression.schema_name(), "users");
/// assert_eq!(expression.predicate().map(|p| p.text()), Some("(version>=2)"));
/// assert_eq!(
///     expression.combined_filter().to_string(),
///     "(&(sluice.schema=users)(version>=2))"
/// );
/// # Ok::<(), sluice_core::ConfigurationError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionExpression {
    text: String,
    schema_name: String,
    predicate: Option<Predicate>,
    filter: Filter,
}

impl SelectionExpression {
    /// Parses a selection expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the schema name is empty, the text
    /// after `;` is not a `filter:=` clause, the predicate is empty, or the
    /// predicate is not a valid filter.
    pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
        let (name, clause) = match text.split_once(';') {
            Some((name, clause)) => (name, Some(clause)),
            None => (text, None),
        };

        let schema_name = name.trim();
        if schema_name.is_empty() {
            return Err(ConfigurationError::EmptySchemaName {
                expression: text.to_owned(),
            });
        }

        let predicate = clause
            .map(|clause| parse_clause(text, clause))
            .transpose()?;

        let filter = combine(schema_name, predicate.as_ref());
        Ok(Self {
            text: text.to_owned(),
            schema_name: schema_name.to_owned(),
            predicate,
            filter,
        })
    }

    /// Expression text exactly as configured.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Schema name the candidates must advertise.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        self.schema_name.as_str()
    }

    /// Optional attribute predicate.
    #[must_use]
    pub const fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Filter combining the schema-name match with the predicate.
    ///
    /// This is the filter candidates are evaluated with.
    #[must_use]
    pub const fn combined_filter(&self) -> &Filter {
        &self.filter
    }
}

impl ProviderFilter for SelectionExpression {
    fn matches(&self, descriptor: &CapabilityDescriptor) -> bool {
        self.filter.matches(descriptor.attributes())
    }

    fn matches_attributes(&self, attributes: &Attributes) -> bool {
        self.filter.matches(attributes)
    }
}

impl FromStr for SelectionExpression {
    type Err = ConfigurationError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl fmt::Display for SelectionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn combine(schema_name: &str, predicate: Option<&Predicate>) -> Filter {
    let name = Filter::equal(ATTR_SCHEMA_NAME, schema_name);
    match predicate {
        Some(predicate) => Filter::And(vec![name, predicate.filter.clone()]),
        None => name,
    }
}

fn parse_clause(expression: &str, clause: &str) -> Result<Predicate, ConfigurationError> {
    let clause = clause.trim();
    let malformed = || ConfigurationError::MalformedFilterClause {
        expression: expression.to_owned(),
        clause: clause.to_owned(),
    };
    let empty = || ConfigurationError::EmptyPredicate {
        expression: expression.to_owned(),
    };

    let body = clause
        .strip_prefix(FILTER_DIRECTIVE)
        .ok_or_else(malformed)?
        .trim();
    if body.is_empty() {
        return Err(empty());
    }

    let text = unquote(body).ok_or_else(malformed)?.trim();
    if is_blank_filter(text) {
        return Err(empty());
    }

    let filter = Filter::parse(text).map_err(|source| ConfigurationError::InvalidPredicate {
        expression: expression.to_owned(),
        source,
    })?;

    Ok(Predicate {
        text: text.to_owned(),
        filter,
    })
}

/// Strips matching quotes, or accepts a bare parenthesised filter.
fn unquote(body: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if let Some(rest) = body.strip_prefix(quote) {
            return rest.strip_suffix(quote);
        }
    }
    body.starts_with('(').then_some(body)
}

fn is_blank_filter(text: &str) -> bool {
    text.trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .is_empty()
}
