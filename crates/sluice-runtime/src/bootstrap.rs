//! Component activation.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use sluice_config::Config;
use sluice_core::{
    Attributes, ConfigurationError, MigrationPort, Orchestrator, OrchestratorParts,
    PublicationPort, SelectionState,
};

use crate::component::MigrationComponent;
use crate::health::HealthReporter;
use crate::options::migration_options;
use crate::telemetry::{self, TelemetryError};

/// Published description of the migrated resource.
pub const PROP_SERVICE_DESCRIPTION: &str = "service.description";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the component configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when any configuration layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere, for hosts that
/// embed several components or build configuration programmatically.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during activation.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The selection expression is missing or malformed.
    #[error("invalid selection configuration: {source}")]
    Selection {
        /// Parse error for the configured expression.
        #[source]
        source: ConfigurationError,
    },
}

/// Resource and ports supplied by the host when a component activates.
#[derive(Debug)]
pub struct Collaborators<R, M, P> {
    /// Shared resource the migration is applied to.
    pub resource: R,
    /// Properties the resource was itself published with.
    pub resource_properties: Attributes,
    /// Engine applying migration scripts.
    pub migration: M,
    /// Registry the migrated resource is published to.
    pub publication: P,
}

impl<R, M, P> Collaborators<R, M, P> {
    /// Bundles a resource with the ports that act on it.
    #[must_use]
    pub fn new(resource: R, migration: M, publication: P) -> Self {
        Self {
            resource,
            resource_properties: Attributes::new(),
            migration,
            publication,
        }
    }

    /// Sets the properties inherited from the wrapped resource.
    #[must_use]
    pub fn with_resource_properties(mut self, properties: Attributes) -> Self {
        self.resource_properties = properties;
        self
    }
}

/// Activates a migration component using the supplied collaborators.
///
/// Loads configuration, initialises telemetry, parses the selection
/// expression and starts the orchestrator. Every stage reports to
/// `reporter`, which also hears about each selection change for the life of
/// the component.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration cannot be loaded, telemetry
/// cannot be installed or the selection expression is absent or malformed.
pub fn activate<R, M, P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    collaborators: Collaborators<R, M, P>,
) -> Result<MigrationComponent<R, M, P>, BootstrapError>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    reporter.activation_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.activation_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.activation_failed(&error);
            return Err(error);
        }
    };

    let orchestrator = match build_orchestrator(&config, collaborators) {
        Ok(orchestrator) => {
            let observer = Arc::clone(&reporter);
            orchestrator.with_observer(move |state: &SelectionState| {
                observer.selection_changed(state);
            })
        }
        Err(source) => {
            let error = BootstrapError::Selection { source };
            reporter.activation_failed(&error);
            return Err(error);
        }
    };

    orchestrator.start();
    reporter.activation_succeeded(&config);

    Ok(MigrationComponent::new(
        config,
        orchestrator,
        telemetry,
        reporter,
    ))
}

fn build_orchestrator<R, M, P>(
    config: &Config,
    collaborators: Collaborators<R, M, P>,
) -> Result<Orchestrator<R, M, P>, ConfigurationError>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    let expression = config
        .selection_expression()
        .ok_or(ConfigurationError::MissingExpression)?;

    let Collaborators {
        resource,
        resource_properties,
        migration,
        publication,
    } = collaborators;
    let inherited =
        resource_properties.with(PROP_SERVICE_DESCRIPTION, config.service_description());
    let mut parts = OrchestratorParts::new(resource, migration, publication)
        .with_options(migration_options(config))
        .with_inherited_properties(inherited);
    if let Some(instance_id) = config.instance_id() {
        parts = parts.with_instance_id(instance_id);
    }

    Orchestrator::new(expression, parts)
}
