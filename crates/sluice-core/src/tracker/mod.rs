//! Single-threaded selection state machine.
//!
//! [`SelectionTracker`] owns the candidate registry, the shared resource, and
//! both ports. It turns provider events into registry mutations and runs the
//! fallback scan: candidates are tried in discovery order and the first
//! successful migration is published. The tracker assumes exclusive access;
//! the [`Orchestrator`](crate::orchestrator::Orchestrator) provides it.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::attributes::Attributes;
use crate::descriptor::{CapabilityDescriptor, Provider, ProviderId};
use crate::event::{ProviderEvent, ProviderSnapshot};
use crate::expression::{ProviderFilter, SelectionExpression};
use crate::migration::{MigrationOptions, MigrationPort};
use crate::orchestrator::OrchestratorParts;
use crate::publication::{PublicationMetadata, PublicationPort};
use crate::registry::{Candidate, CandidateRegistry, CandidateSnapshot};

const SELECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::selection");

/// Observable state of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    /// Nothing is published and no candidate is waiting to be tried.
    Idle,
    /// A scan is due or in progress.
    Selecting,
    /// A migrated resource is published for this provider.
    Active {
        /// Provider whose migration succeeded.
        provider: ProviderId,
    },
    /// Every candidate failed; waiting for the population to change.
    Unfulfilled {
        /// Number of registered candidates, all of which failed.
        candidates: usize,
    },
}

impl SelectionState {
    /// Returns `true` when a resource is published.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

struct ActiveSelection<H> {
    provider: Provider,
    handle: H,
}

/// Registry, ports, and the at-most-one active selection.
///
/// Mutations happen through [`apply`](Self::apply); the scan runs in
/// [`select_if_necessary`](Self::select_if_necessary). Keeping them apart
/// lets a caller apply a batch of events and scan once.
pub struct SelectionTracker<R, M, P>
where
    P: PublicationPort<R>,
{
    expression: Arc<SelectionExpression>,
    registry: CandidateRegistry,
    resource: R,
    migration: M,
    publication: P,
    options: MigrationOptions,
    instance_id: Option<String>,
    inherited: Attributes,
    active: Option<ActiveSelection<P::Handle>>,
    state: SelectionState,
    scan_pending: bool,
    closed: bool,
}

impl<R, M, P> SelectionTracker<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    /// Creates an idle tracker for `expression`.
    #[must_use]
    pub fn new(parsed: SelectionExpression, parts: OrchestratorParts<R, M, P>) -> Self {
        let expression = Arc::new(parsed);
        let filter: Arc<dyn ProviderFilter> = expression.clone();
        let OrchestratorParts {
            resource,
            migration,
            publication,
            options,
            instance_id,
            inherited_properties,
        } = parts;
        Self {
            expression,
            registry: CandidateRegistry::new(filter),
            resource,
            migration,
            publication,
            options,
            instance_id,
            inherited: inherited_properties,
            active: None,
            state: SelectionState::Idle,
            scan_pending: false,
            closed: false,
        }
    }

    /// Applies one provider event to the registry.
    ///
    /// Losing the active provider, by removal or by a changed descriptor,
    /// retracts the publication before anything else happens. Returns `true`
    /// when a scan is now due.
    pub fn apply(&mut self, event: ProviderEvent) -> bool {
        if self.closed {
            debug!(
                target: SELECTION_TARGET,
                provider = %event.provider_id(),
                kind = event.kind(),
                "tracker closed; event ignored"
            );
            return false;
        }

        let id = event.provider_id().clone();
        let was_active = self.is_active_provider(&id);
        let changed = match event {
            ProviderEvent::Added(snapshot) | ProviderEvent::Changed(snapshot) => {
                self.upsert(snapshot)
            }
            ProviderEvent::Removed(_) => self.registry.remove(&id).is_some(),
        };

        if !changed {
            return self.scan_pending;
        }
        if was_active {
            self.retract_active("active provider changed or departed");
            self.request_scan();
        } else if self.active.is_none() && self.registry.contains(&id) {
            self.request_scan();
        } else if self.active.is_none() && !self.scan_pending {
            self.settle_unselected();
        }
        self.scan_pending
    }

    /// Runs the fallback scan if one is due.
    ///
    /// Walks a snapshot of the registry in discovery order, attempting each
    /// candidate until a migration succeeds. A failed attempt is logged and
    /// the next candidate is tried. Exhausting the list is not an error.
    pub fn select_if_necessary(&mut self) {
        if self.closed || !self.scan_pending {
            return;
        }
        self.scan_pending = false;
        if self.active.is_some() {
            return;
        }

        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            self.state = SelectionState::Idle;
            return;
        }
        self.state = SelectionState::Selecting;
        info!(
            target: SELECTION_TARGET,
            expression = self.expression.text(),
            candidates = snapshot.len(),
            "scanning candidates"
        );

        for candidate in &snapshot {
            if self.try_candidate(candidate) {
                return;
            }
        }
        self.exhausted(&snapshot);
    }

    /// Current selection state.
    #[must_use]
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Provider whose migrated resource is currently published.
    #[must_use]
    pub fn active_provider(&self) -> Option<&Provider> {
        self.active.as_ref().map(|active| &active.provider)
    }

    /// Point-in-time copy of the candidates in discovery order.
    #[must_use]
    pub fn candidates(&self) -> CandidateSnapshot {
        self.registry.snapshot()
    }

    /// The parsed selection expression.
    #[must_use]
    pub fn expression(&self) -> &SelectionExpression {
        &self.expression
    }

    /// Retracts any publication and discards all candidates.
    ///
    /// A closed tracker ignores further events.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.retract_active("selection closed");
        self.registry.clear();
        self.scan_pending = false;
        self.closed = true;
        self.state = SelectionState::Idle;
    }

    fn upsert(&mut self, snapshot: ProviderSnapshot) -> bool {
        let descriptor = self.matching_descriptor(&snapshot);
        let provider = snapshot.provider().clone();
        let outcome = self.registry.upsert(provider, descriptor);
        debug!(
            target: SELECTION_TARGET,
            provider = %snapshot.provider().id(),
            outcome = ?outcome,
            "registry updated"
        );
        outcome.changed()
    }

    /// First capability of `snapshot` that matches and is complete.
    fn matching_descriptor(&self, snapshot: &ProviderSnapshot) -> Option<CapabilityDescriptor> {
        snapshot
            .capabilities()
            .iter()
            .filter(|attributes| self.expression.matches_attributes(attributes))
            .find_map(
                |attributes| match CapabilityDescriptor::from_attributes(attributes.clone()) {
                    Ok(descriptor) => Some(descriptor),
                    Err(error) => {
                        warn!(
                            target: SELECTION_TARGET,
                            provider = %snapshot.provider(),
                            error = %error,
                            "matching capability is incomplete; skipping"
                        );
                        None
                    }
                },
            )
    }

    fn try_candidate(&mut self, candidate: &Candidate) -> bool {
        let provider = candidate.provider();
        let descriptor = candidate.descriptor();
        let result = self.migration.attempt(
            &self.resource,
            provider,
            descriptor.resource_locator(),
            &self.options,
        );
        match result {
            Ok(()) => {
                self.publish(candidate);
                true
            }
            Err(failure) => {
                error!(
                    target: SELECTION_TARGET,
                    provider = %provider,
                    resource = descriptor.resource_locator(),
                    error = %failure,
                    "migration attempt failed; trying next candidate"
                );
                false
            }
        }
    }

    fn publish(&mut self, candidate: &Candidate) {
        let provider = candidate.provider().clone();
        let descriptor = candidate.descriptor();
        let metadata = PublicationMetadata::new(
            provider.clone(),
            self.expression.schema_name(),
            descriptor.resource_locator(),
            self.expression.text(),
        )
        .with_instance_id(self.instance_id.clone())
        .with_inherited(self.inherited.clone());

        let handle = self.publication.publish(&self.resource, metadata);
        info!(
            target: SELECTION_TARGET,
            provider = %provider,
            schema = self.expression.schema_name(),
            resource = descriptor.resource_locator(),
            "migrated resource published"
        );
        self.state = SelectionState::Active {
            provider: provider.id().clone(),
        };
        self.active = Some(ActiveSelection { provider, handle });
    }

    fn exhausted(&mut self, snapshot: &CandidateSnapshot) {
        warn!(
            target: SELECTION_TARGET,
            expression = self.expression.text(),
            candidates = snapshot.len(),
            "no candidate could be migrated; waiting for providers to change"
        );
        self.state = SelectionState::Unfulfilled {
            candidates: snapshot.len(),
        };
    }

    fn retract_active(&mut self, reason: &'static str) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.publication.retract(active.handle);
        info!(
            target: SELECTION_TARGET,
            provider = %active.provider,
            reason,
            "publication retracted"
        );
        self.state = SelectionState::Idle;
    }

    /// Keeps the idle or unfulfilled state in step with a shrunken registry.
    fn settle_unselected(&mut self) {
        if self.registry.is_empty() {
            self.state = SelectionState::Idle;
        } else if let SelectionState::Unfulfilled { candidates } = &mut self.state {
            *candidates = self.registry.len();
        }
    }

    fn request_scan(&mut self) {
        self.scan_pending = true;
        self.state = SelectionState::Selecting;
    }

    fn is_active_provider(&self, id: &ProviderId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.provider.id() == id)
    }
}
