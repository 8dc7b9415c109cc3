//! Shared configuration for Sluice migration components.
//!
//! Values are layered with [`ortho_config`]: built-in defaults first, then a
//! `sluice.toml` file (or the file named by `--config-path`), then
//! `SLUICE_*` environment variables and finally CLI flags. The migration
//! passthrough options mirror the engine settings carried by
//! `sluice_core::MigrationOptions` and are left unset unless configured.

mod choices;
mod defaults;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use choices::{ChoiceParseError, LogFormat, ObjectQuotingStrategy};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_SERVICE_DESCRIPTION, default_log_filter,
    default_log_filter_string, default_log_format, default_service_description,
};

/// Resolved configuration for one migration component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SLUICE")]
pub struct Config {
    /// Tracing filter applied to telemetry output.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Format used when emitting telemetry.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Selection expression naming the schema and an optional filter, for
    /// example `users;filter:=(version>=2)`.
    pub selection_expression: Option<String>,
    /// Identity published as `service.pid` alongside the migrated resource.
    pub instance_id: Option<String>,
    /// Human-readable description of the published resource.
    #[ortho_config(default = default_service_description())]
    pub service_description: String,
    /// Changeset contexts to run.
    pub contexts: Option<String>,
    /// Label expression restricting the changesets to run.
    pub label_expression: Option<String>,
    /// Tag to roll forward to.
    pub tag: Option<String>,
    /// Catalog used for unqualified objects.
    pub default_catalog: Option<String>,
    /// Schema used for unqualified objects.
    pub default_schema: Option<String>,
    /// Catalog holding the changelog tables.
    pub changelog_catalog: Option<String>,
    /// Schema holding the changelog tables.
    pub changelog_schema: Option<String>,
    /// Tablespace for the changelog tables.
    pub changelog_tablespace: Option<String>,
    /// Name of the changelog table.
    pub changelog_table: Option<String>,
    /// Name of the changelog lock table.
    pub changelog_lock_table: Option<String>,
    /// SQL function used to read the current timestamp.
    pub current_datetime_function: Option<String>,
    /// Quoting applied to object names.
    pub object_quoting_strategy: Option<ObjectQuotingStrategy>,
    /// Whether the engine commits each statement.
    pub auto_commit: Option<bool>,
    /// Whether the engine may cache changelog lookups.
    pub can_cache_changelog_info: Option<bool>,
    /// Whether generated SQL names the default catalog.
    pub output_default_catalog: Option<bool>,
    /// Whether generated SQL names the default schema.
    pub output_default_schema: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            selection_expression: None,
            instance_id: None,
            service_description: default_service_description(),
            contexts: None,
            label_expression: None,
            tag: None,
            default_catalog: None,
            default_schema: None,
            changelog_catalog: None,
            changelog_schema: None,
            changelog_tablespace: None,
            changelog_table: None,
            changelog_lock_table: None,
            current_datetime_function: None,
            object_quoting_strategy: None,
            auto_commit: None,
            can_cache_changelog_info: None,
            output_default_catalog: None,
            output_default_schema: None,
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the selection expression, if one is configured.
    ///
    /// Blank values count as unset.
    #[must_use]
    pub fn selection_expression(&self) -> Option<&str> {
        self.selection_expression
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Returns the instance identity, if configured.
    #[must_use]
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Returns the description of the published resource.
    #[must_use]
    pub fn service_description(&self) -> &str {
        self.service_description.as_str()
    }

    /// Returns the configured object quoting strategy.
    #[must_use]
    pub fn object_quoting_strategy(&self) -> Option<ObjectQuotingStrategy> {
        self.object_quoting_strategy
    }
}
