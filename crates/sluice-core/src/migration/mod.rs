//! Boundary to the external migration engine.
//!
//! The core never applies changesets itself. It hands the shared resource and
//! the winning candidate's resource locator to a [`MigrationPort`] and reacts
//! to the outcome. [`MigrationOptions`] are carried through verbatim.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::descriptor::Provider;
use crate::error::MigrationFailure;

/// Applies a provider's migration script to the shared resource.
///
/// Calls are strictly sequential per orchestrator: the next candidate is
/// only attempted after the previous call returns. The core imposes no
/// timeout, so implementations needing bounded latency must enforce one.
///
/// # Example
///
/// ```
/// use sluice_core::{MigrationFailure, MigrationOptions, MigrationPort, Provider};
///
/// struct Database;
/// struct RejectAll;
///
/// impl MigrationPort<Database> for RejectAll {
///     fn attempt(
///         &self,
///         _resource: &Database,
///         _provider: &Provider,
///         resource_locator: &str,
///         _options: &MigrationOptions,
///     ) -> Result<(), MigrationFailure> {
///         Err(MigrationFailure::new(format!("{resource_locator} rejected")))
///     }
/// }
/// ```
pub trait MigrationPort<R: ?Sized>: Send + Sync {
    /// Brings `resource` up to date with the script at `resource_locator`.
    ///
    /// `provider` owns the script and lets the engine resolve the locator.
    ///
    /// # Errors
    ///
    /// Returns [`MigrationFailure`] when the engine cannot apply the script.
    /// The orchestrator logs it and falls back to the next candidate.
    fn attempt(
        &self,
        resource: &R,
        provider: &Provider,
        resource_locator: &str,
        options: &MigrationOptions,
    ) -> Result<(), MigrationFailure>;
}

impl<R: ?Sized, T: MigrationPort<R> + ?Sized> MigrationPort<R> for Arc<T> {
    fn attempt(
        &self,
        resource: &R,
        provider: &Provider,
        resource_locator: &str,
        options: &MigrationOptions,
    ) -> Result<(), MigrationFailure> {
        (**self).attempt(resource, provider, resource_locator, options)
    }
}

/// Engine settings passed through without interpretation.
///
/// Every field is optional; an unset field leaves the engine default alone.
///
/// # Example
///
/// ```
/// use sluice_core::MigrationOptions;
///
/// let options = MigrationOptions::default()
///     .with_contexts("production")
///     .with_default_schema("app")
///     .with_auto_commit(false);
/// assert_eq!(options.contexts(), Some("production"));
/// assert_eq!(options.auto_commit(), Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MigrationOptions {
    contexts: Option<String>,
    label_expression: Option<String>,
    tag: Option<String>,
    default_catalog: Option<String>,
    default_schema: Option<String>,
    changelog_catalog: Option<String>,
    changelog_schema: Option<String>,
    changelog_tablespace: Option<String>,
    changelog_table: Option<String>,
    changelog_lock_table: Option<String>,
    current_datetime_function: Option<String>,
    object_quoting_strategy: Option<String>,
    auto_commit: Option<bool>,
    can_cache_changelog_info: Option<bool>,
    output_default_catalog: Option<bool>,
    output_default_schema: Option<bool>,
}

macro_rules! text_option {
    ($(#[$doc:meta] $field:ident, $setter:ident;)+) => {
        impl MigrationOptions {
            $(
                #[$doc]
                #[must_use]
                pub fn $field(&self) -> Option<&str> {
                    self.$field.as_deref()
                }

                #[$doc]
                #[must_use]
                pub fn $setter(mut self, value: impl Into<String>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )+
        }
    };
}

macro_rules! flag_option {
    ($(#[$doc:meta] $field:ident, $setter:ident;)+) => {
        impl MigrationOptions {
            $(
                #[$doc]
                #[must_use]
                pub const fn $field(&self) -> Option<bool> {
                    self.$field
                }

                #[$doc]
                #[must_use]
                pub const fn $setter(mut self, value: bool) -> Self {
                    self.$field = Some(value);
                    self
                }
            )+
        }
    };
}

text_option! {
    /// Comma-separated execution contexts.
    contexts, with_contexts;
    /// Label expression restricting which changesets run.
    label_expression, with_label_expression;
    /// Point-in-time tag applied after a successful run.
    tag, with_tag;
    /// Catalog used for unqualified objects.
    default_catalog, with_default_catalog;
    /// Schema used for unqualified objects.
    default_schema, with_default_schema;
    /// Catalog holding the changelog tables.
    changelog_catalog, with_changelog_catalog;
    /// Schema holding the changelog tables.
    changelog_schema, with_changelog_schema;
    /// Tablespace for the changelog tables.
    changelog_tablespace, with_changelog_tablespace;
    /// Name of the changelog table.
    changelog_table, with_changelog_table;
    /// Name of the changelog lock table.
    changelog_lock_table, with_changelog_lock_table;
    /// SQL function returning the current timestamp.
    current_datetime_function, with_current_datetime_function;
    /// Identifier quoting strategy name.
    object_quoting_strategy, with_object_quoting_strategy;
}

flag_option! {
    /// Whether the engine commits after each statement.
    auto_commit, with_auto_commit;
    /// Whether the engine may cache changelog table metadata.
    can_cache_changelog_info, with_can_cache_changelog_info;
    /// Whether generated SQL names the default catalog.
    output_default_catalog, with_output_default_catalog;
    /// Whether generated SQL names the default schema.
    output_default_schema, with_output_default_schema;
}
