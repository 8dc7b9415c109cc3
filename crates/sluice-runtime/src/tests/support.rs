//! Test doubles for activation suites.

use std::ffi::OsString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};

use sluice_config::Config;
use sluice_core::{
    ATTR_SCHEMA_NAME, ATTR_SCHEMA_RESOURCE, Attributes, MigrationFailure, MigrationOptions,
    MigrationPort, Provider, ProviderEvent, ProviderId, ProviderSnapshot, PublicationMetadata,
    PublicationPort, SelectionState,
};

use crate::bootstrap::{BootstrapError, Collaborators, ConfigLoader};
use crate::health::HealthReporter;

/// Stand-in for the shared database.
#[derive(Debug)]
pub struct Database;

/// Migration engine that records attempts and fails for selected providers.
#[derive(Debug, Clone, Default)]
pub struct RecordingMigration {
    failing: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<Vec<(String, MigrationOptions)>>>,
}

impl RecordingMigration {
    pub fn fail_for(&self, provider: &str) {
        self.failing
            .lock()
            .expect("migration mutex poisoned")
            .push(provider.to_owned());
    }

    pub fn attempted(&self) -> Vec<String> {
        self.attempts
            .lock()
            .expect("migration mutex poisoned")
            .iter()
            .map(|(provider, _)| provider.clone())
            .collect()
    }

    pub fn last_options(&self) -> Option<MigrationOptions> {
        self.attempts
            .lock()
            .expect("migration mutex poisoned")
            .last()
            .map(|(_, options)| options.clone())
    }
}

impl MigrationPort<Database> for RecordingMigration {
    fn attempt(
        &self,
        _resource: &Database,
        provider: &Provider,
        _resource_locator: &str,
        options: &MigrationOptions,
    ) -> Result<(), MigrationFailure> {
        let id = provider.id().to_string();
        self.attempts
            .lock()
            .expect("migration mutex poisoned")
            .push((id.clone(), options.clone()));
        let failing = self.failing.lock().expect("migration mutex poisoned");
        if failing.contains(&id) {
            return Err(MigrationFailure::new(format!("{id} refused")));
        }
        Ok(())
    }
}

type Reentry = Box<dyn FnOnce() + Send>;

/// Engine that runs a host callback inside its first attempt.
#[derive(Clone, Default)]
pub struct ReentrantMigration {
    inner: RecordingMigration,
    reentry: Arc<Mutex<Option<Reentry>>>,
}

impl ReentrantMigration {
    pub fn during_first_attempt(&self, reentry: impl FnOnce() + Send + 'static) {
        *self.reentry.lock().expect("reentry mutex poisoned") = Some(Box::new(reentry));
    }

    pub fn attempted(&self) -> Vec<String> {
        self.inner.attempted()
    }
}

impl MigrationPort<Database> for ReentrantMigration {
    fn attempt(
        &self,
        resource: &Database,
        provider: &Provider,
        resource_locator: &str,
        options: &MigrationOptions,
    ) -> Result<(), MigrationFailure> {
        let reentry = self.reentry.lock().expect("reentry mutex poisoned").take();
        if let Some(reentry) = reentry {
            reentry();
        }
        self.inner
            .attempt(resource, provider, resource_locator, options)
    }
}

/// Publication registry recording published properties.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublication {
    published: Arc<Mutex<Vec<Attributes>>>,
    retracted: Arc<AtomicUsize>,
}

impl RecordingPublication {
    pub fn published(&self) -> Vec<Attributes> {
        self.published
            .lock()
            .expect("publication mutex poisoned")
            .clone()
    }

    pub fn retractions(&self) -> usize {
        self.retracted.load(Ordering::SeqCst)
    }
}

impl PublicationPort<Database> for RecordingPublication {
    type Handle = usize;

    fn publish(&self, _resource: &Database, metadata: PublicationMetadata) -> usize {
        let mut published = self.published.lock().expect("publication mutex poisoned");
        published.push(metadata.to_properties());
        published.len()
    }

    fn retract(&self, _handle: usize) {
        self.retracted.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    ActivationStarting,
    ActivationSucceeded,
    ActivationFailed(String),
    SelectionChanged(SelectionState),
    Deactivated,
}

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn activation_starting(&self) {
        self.record(HealthEvent::ActivationStarting);
    }

    fn activation_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::ActivationSucceeded);
    }

    fn activation_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::ActivationFailed(error.to_string()));
    }

    fn selection_changed(&self, state: &SelectionState) {
        self.record(HealthEvent::SelectionChanged(state.clone()));
    }

    fn deactivated(&self) {
        self.record(HealthEvent::Deactivated);
    }
}

/// Loader that rejects an unknown quoting strategy on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("sluice"),
            OsString::from("--object-quoting-strategy"),
            OsString::from("quote_nothing"),
        ];
        Config::load_from_iter(args)
    }
}

/// Configuration selecting `expression` with defaults elsewhere.
pub fn config_for(expression: &str) -> Config {
    Config {
        selection_expression: Some(expression.to_owned()),
        log_filter: "off".to_owned(),
        ..Config::default()
    }
}

/// Ports shared between a test and the component it activates.
pub struct Ports {
    pub migration: RecordingMigration,
    pub publication: RecordingPublication,
}

impl Ports {
    pub fn new() -> Self {
        Self {
            migration: RecordingMigration::default(),
            publication: RecordingPublication::default(),
        }
    }

    pub fn collaborators(&self) -> Collaborators<Database, RecordingMigration, RecordingPublication> {
        Collaborators::new(Database, self.migration.clone(), self.publication.clone())
    }
}

/// A provider offering `schema` from `db/<id>.xml`.
pub fn offering(id: &str, schema: &str) -> ProviderEvent {
    ProviderEvent::Added(
        ProviderSnapshot::new(Provider::new(id)).with_capability(
            Attributes::new()
                .with(ATTR_SCHEMA_NAME, schema)
                .with(ATTR_SCHEMA_RESOURCE, format!("db/{id}.xml")),
        ),
    )
}

/// Departure of provider `id`.
pub fn departure(id: &str) -> ProviderEvent {
    ProviderEvent::Removed(ProviderId::new(id))
}
