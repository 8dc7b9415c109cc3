//! Translation of configuration values into engine passthrough options.

use sluice_config::Config;
use sluice_core::MigrationOptions;

macro_rules! carry {
    ($options:ident, $config:ident; $($field:ident => $setter:ident),+ $(,)?) => {
        $(
            if let Some(value) = $config.$field.clone() {
                $options = $options.$setter(value);
            }
        )+
    };
}

/// Builds the options handed to every migration attempt.
///
/// Unset configuration values stay unset so the engine keeps its defaults.
#[must_use]
pub fn migration_options(config: &Config) -> MigrationOptions {
    let mut options = MigrationOptions::default();
    carry!(options, config;
        contexts => with_contexts,
        label_expression => with_label_expression,
        tag => with_tag,
        default_catalog => with_default_catalog,
        default_schema => with_default_schema,
        changelog_catalog => with_changelog_catalog,
        changelog_schema => with_changelog_schema,
        changelog_tablespace => with_changelog_tablespace,
        changelog_table => with_changelog_table,
        changelog_lock_table => with_changelog_lock_table,
        current_datetime_function => with_current_datetime_function,
        auto_commit => with_auto_commit,
        can_cache_changelog_info => with_can_cache_changelog_info,
        output_default_catalog => with_output_default_catalog,
        output_default_schema => with_output_default_schema,
    );
    if let Some(strategy) = config.object_quoting_strategy() {
        options = options.with_object_quoting_strategy(strategy.engine_name());
    }
    options
}
