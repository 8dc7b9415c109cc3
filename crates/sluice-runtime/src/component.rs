//! Handle for an activated migration component.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sluice_config::Config;
use sluice_core::{
    CandidateSnapshot, MigrationPort, Orchestrator, Provider, ProviderEvent, PublicationPort,
    SelectionState,
};

use crate::health::HealthReporter;
use crate::telemetry::TelemetryHandle;

/// A running orchestrator together with the configuration it was built from.
///
/// Hosts forward provider lifecycle events through [`deliver`](Self::deliver)
/// and call [`deactivate`](Self::deactivate) on shutdown. Dropping the
/// component deactivates it.
///
/// Delivery may re-enter from inside a port callback: the event is queued and
/// applied by the delivery already in progress. Selection changes reach the
/// [`HealthReporter`] from whichever caller applied them.
pub struct MigrationComponent<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    config: Config,
    orchestrator: Orchestrator<R, M, P>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
    deactivated: AtomicBool,
}

impl<R, M, P> MigrationComponent<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    pub(crate) fn new(
        config: Config,
        orchestrator: Orchestrator<R, M, P>,
        telemetry: TelemetryHandle,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            telemetry,
            reporter,
            deactivated: AtomicBool::new(false),
        }
    }

    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Forwards one provider event to the orchestrator.
    pub fn deliver(&self, event: ProviderEvent) {
        self.deliver_all([event]);
    }

    /// Forwards a burst of provider events as one batch.
    pub fn deliver_all(&self, events: impl IntoIterator<Item = ProviderEvent>) {
        self.orchestrator.deliver_all(events);
    }

    /// Current selection state.
    #[must_use]
    pub fn state(&self) -> SelectionState {
        self.orchestrator.state()
    }

    /// Provider whose migration is currently published.
    #[must_use]
    pub fn active_provider(&self) -> Option<Provider> {
        self.orchestrator.active_provider()
    }

    /// Matching candidates in discovery order.
    #[must_use]
    pub fn candidates(&self) -> CandidateSnapshot {
        self.orchestrator.candidates()
    }

    /// Retracts any publication and stops reacting to events.
    ///
    /// Idempotent; only the first call reports deactivation.
    pub fn deactivate(&self) {
        if self.deactivated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.orchestrator.stop();
        self.reporter.deactivated();
    }
}

impl<R, M, P> Drop for MigrationComponent<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    fn drop(&mut self) {
        self.deactivate();
    }
}
