use crate::choices::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default description published alongside the migrated resource.
pub const DEFAULT_SERVICE_DESCRIPTION: &str = "Sluice migrated resource";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned service description used where allocation is required.
#[must_use]
pub fn default_service_description() -> String {
    DEFAULT_SERVICE_DESCRIPTION.to_owned()
}
