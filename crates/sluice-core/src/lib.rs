//! Dynamic capability selection and migration orchestration for Sluice.
//!
//! A component that owns a shared database resource wants exactly one schema
//! migration applied to it before dependents may use it. The script is not
//! configured statically: it is discovered at runtime among competing
//! providers, each advertising schema capabilities as attribute sets.
//!
//! `sluice-core` implements the moving parts:
//!
//! - [`SelectionExpression`] parses `schemaName[;filter:=(predicate)]` and acts
//!   as the [`ProviderFilter`] for capability descriptors.
//! - [`CandidateRegistry`] keeps matching providers in discovery order.
//! - [`SelectionTracker`] is the state machine that tries candidates in order
//!   through the [`MigrationPort`] and publishes the first success through the
//!   [`PublicationPort`], falling back when a candidate fails or departs.
//! - [`Orchestrator`] serialises concurrent [`ProviderEvent`] delivery onto the
//!   tracker and coalesces bursts into a single scan.
//!
//! Only [`ConfigurationError`] escapes to callers. Per-candidate problems are
//! logged through `tracing` and drive the fallback chain instead.
//!
//! # Example
//!
//! ```
//! use std::sync::Mutex;
//! use sluice_core::{
//!     Attributes, MigrationFailure, MigrationOptions, MigrationPort, Orchestrator,
//!     OrchestratorParts, Provider, ProviderEvent, ProviderSnapshot, PublicationMetadata,
//!     PublicationPort,
//! };
//!
//! struct Database;
//!
//! struct Engine;
//! impl MigrationPort<Database> for Engine {
//!     fn attempt(
//!         &self,
//!         _resource: &Database,
//!         _provider: &Provider,
//!         resource_locator: &str,
//!         _options: &MigrationOptions,
//!     ) -> Result<(), MigrationFailure> {
//!         if resource_locator.contains("broken") {
//!             return Err(MigrationFailure::new("checksum mismatch"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Registry(Mutex<Vec<String>>);
//! impl PublicationPort<Database> for Registry {
//!     type Handle = ();
//!     fn publish(&self, _resource: &Database, metadata: PublicationMetadata) {
//!         let id = metadata.provider().id().to_string();
//!         self.0.lock().expect("lock").push(id);
//!     }
//!     fn retract(&self, _handle: ()) {}
//! }
//!
//! let offering = |id: &str, script: &str| {
//!     ProviderEvent::Added(ProviderSnapshot::new(Provider::new(id)).with_capability(
//!         Attributes::new()
//!             .with("sluice.schema", "users")
//!             .with("resource", script),
//!     ))
//! };
//!
//! let orchestrator = Orchestrator::new(
//!     "users",
//!     OrchestratorParts::new(Database, Engine, Registry::default()),
//! )?;
//! orchestrator.start();
//! orchestrator.deliver_all([offering("p1", "db/broken.xml"), offering("p2", "db/users.xml")]);
//!
//! let active = orchestrator.active_provider().map(|p| p.id().to_string());
//! assert_eq!(active.as_deref(), Some("p2"));
//! # Ok::<(), sluice_core::ConfigurationError>(())
//! ```

pub mod attributes;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod expression;
pub mod filter;
pub mod migration;
pub mod orchestrator;
pub mod publication;
pub mod registry;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use self::attributes::{
    ATTR_SCHEMA_NAME, ATTR_SCHEMA_RESOURCE, AttributeValue, Attributes, SCHEMA_NAMESPACE,
};
pub use self::descriptor::{CapabilityDescriptor, Provider, ProviderId};
pub use self::error::{ConfigurationError, DescriptorError, MigrationFailure};
pub use self::event::{ProviderEvent, ProviderSnapshot};
pub use self::expression::{Predicate, ProviderFilter, SelectionExpression};
pub use self::filter::{Comparison, Filter, FilterParseError, SubstringPattern};
pub use self::migration::{MigrationOptions, MigrationPort};
pub use self::orchestrator::{Orchestrator, OrchestratorParts, SelectionObserver};
pub use self::publication::{PublicationMetadata, PublicationPort};
pub use self::registry::{Candidate, CandidateRegistry, CandidateSnapshot, UpsertOutcome};
pub use self::tracker::{SelectionState, SelectionTracker};
