//! Component runtime for Sluice migrations.
//!
//! A host (a service registry, a plugin loader, an application `main`)
//! activates one [`MigrationComponent`] per shared resource. Activation loads
//! [`sluice_config::Config`] through a [`ConfigLoader`], installs structured
//! telemetry, parses the configured selection expression and starts a
//! [`sluice_core::Orchestrator`] wired to the host's migration engine and
//! publication registry. The host then forwards provider lifecycle events to
//! the component until it deactivates it.
//!
//! Lifecycle milestones are reported through a [`HealthReporter`];
//! [`StructuredHealthReporter`] writes them as `tracing` events.

mod bootstrap;
mod component;
mod health;
mod options;
mod telemetry;

pub use bootstrap::{
    BootstrapError, Collaborators, ConfigLoader, PROP_SERVICE_DESCRIPTION, StaticConfigLoader,
    SystemConfigLoader, activate,
};
pub use component::MigrationComponent;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use options::migration_options;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
