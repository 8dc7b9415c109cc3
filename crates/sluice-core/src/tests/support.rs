//! Recording port doubles shared by the tracker, orchestrator, and BDD tests.
//!
//! Both doubles write into one [`Journal`] so tests can assert the relative
//! order of migration attempts, publications, and retractions.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::attributes::{ATTR_SCHEMA_NAME, ATTR_SCHEMA_RESOURCE, Attributes};
use crate::descriptor::Provider;
use crate::error::MigrationFailure;
use crate::event::{ProviderEvent, ProviderSnapshot};
use crate::migration::{MigrationOptions, MigrationPort};
use crate::orchestrator::OrchestratorParts;
use crate::publication::{PublicationMetadata, PublicationPort};

/// Stand-in for the shared database resource.
#[derive(Debug, Default)]
pub struct SharedDatabase;

/// One observed port interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    /// A migration attempt for a provider and script.
    Attempt { provider: String, resource: String },
    /// A publication for a provider.
    Publish { provider: String, handle: u32 },
    /// A retraction of an earlier publication.
    Retract { handle: u32 },
}

/// Ordered log of port calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<PortCall>>>);

impl Journal {
    fn record(&self, call: PortCall) {
        self.0.lock().expect("journal mutex poisoned").push(call);
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<PortCall> {
        self.0.lock().expect("journal mutex poisoned").clone()
    }

    /// Provider ids of every migration attempt, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PortCall::Attempt { provider, .. } => Some(provider),
                _ => None,
            })
            .collect()
    }

    /// Provider ids of every publication, in order.
    pub fn publications(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PortCall::Publish { provider, .. } => Some(provider),
                _ => None,
            })
            .collect()
    }

    /// Number of retractions.
    pub fn retractions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PortCall::Retract { .. }))
            .count()
    }

    /// Publications not yet retracted.
    pub fn live_publications(&self) -> usize {
        self.publications().len() - self.retractions()
    }
}

/// Migration double that fails for configured providers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMigration {
    journal: Journal,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl ScriptedMigration {
    /// Makes every future attempt for `provider` fail.
    pub fn fail_for(&self, provider: &str) {
        self.failing
            .lock()
            .expect("script mutex poisoned")
            .insert(provider.to_owned());
    }

    /// Makes future attempts for `provider` succeed again.
    pub fn succeed_for(&self, provider: &str) {
        self.failing
            .lock()
            .expect("script mutex poisoned")
            .remove(provider);
    }
}

impl MigrationPort<SharedDatabase> for ScriptedMigration {
    fn attempt(
        &self,
        _resource: &SharedDatabase,
        provider: &Provider,
        resource_locator: &str,
        _options: &MigrationOptions,
    ) -> Result<(), MigrationFailure> {
        let id = provider.id().to_string();
        self.journal.record(PortCall::Attempt {
            provider: id.clone(),
            resource: resource_locator.to_owned(),
        });
        let failing = self
            .failing
            .lock()
            .expect("script mutex poisoned")
            .contains(&id);
        if failing {
            Err(MigrationFailure::new(format!("{resource_locator} rejected")))
        } else {
            Ok(())
        }
    }
}

/// Publication double handing out sequential handles.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublication {
    journal: Journal,
    next_handle: Arc<AtomicU32>,
    metadata: Arc<Mutex<Vec<PublicationMetadata>>>,
}

impl RecordingPublication {
    /// Metadata of every publication, in order.
    pub fn metadata(&self) -> Vec<PublicationMetadata> {
        self.metadata.lock().expect("metadata mutex poisoned").clone()
    }
}

impl PublicationPort<SharedDatabase> for RecordingPublication {
    type Handle = u32;

    fn publish(&self, _resource: &SharedDatabase, metadata: PublicationMetadata) -> u32 {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.journal.record(PortCall::Publish {
            provider: metadata.provider().id().to_string(),
            handle,
        });
        self.metadata
            .lock()
            .expect("metadata mutex poisoned")
            .push(metadata);
        handle
    }

    fn retract(&self, handle: u32) {
        self.journal.record(PortCall::Retract { handle });
    }
}

/// Doubles wired to a common journal.
#[derive(Debug, Clone, Default)]
pub struct Ports {
    pub journal: Journal,
    pub migration: ScriptedMigration,
    pub publication: RecordingPublication,
}

impl Ports {
    /// Creates doubles sharing one journal.
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            migration: ScriptedMigration {
                journal: journal.clone(),
                ..ScriptedMigration::default()
            },
            publication: RecordingPublication {
                journal: journal.clone(),
                ..RecordingPublication::default()
            },
            journal,
        }
    }

    /// Orchestrator parts using clones of these doubles.
    pub fn parts(
        &self,
    ) -> OrchestratorParts<SharedDatabase, ScriptedMigration, RecordingPublication> {
        OrchestratorParts::new(
            SharedDatabase,
            self.migration.clone(),
            self.publication.clone(),
        )
    }
}

/// Capability attributes for `schema` at `version`.
pub fn capability(schema: &str, version: i64) -> Attributes {
    Attributes::new()
        .with(ATTR_SCHEMA_NAME, schema)
        .with(ATTR_SCHEMA_RESOURCE, format!("db/{schema}-{version}.xml"))
        .with("version", version)
}

/// Snapshot of `provider` offering one capability.
pub fn offering(provider: &str, schema: &str, version: i64) -> ProviderSnapshot {
    ProviderSnapshot::new(Provider::new(provider)).with_capability(capability(schema, version))
}

/// `Added` event for `provider` offering `schema` at `version`.
pub fn added(provider: &str, schema: &str, version: i64) -> ProviderEvent {
    ProviderEvent::Added(offering(provider, schema, version))
}

/// `Changed` event for `provider` offering `schema` at `version`.
pub fn changed(provider: &str, schema: &str, version: i64) -> ProviderEvent {
    ProviderEvent::Changed(offering(provider, schema, version))
}

/// `Removed` event for `provider`.
pub fn removed(provider: &str) -> ProviderEvent {
    ProviderEvent::Removed(provider.into())
}
