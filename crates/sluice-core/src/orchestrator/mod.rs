//! Thread-safe event intake around the selection state machine.
//!
//! Provider events may arrive on any thread, concurrently. The
//! [`Orchestrator`] queues them and lets whichever caller first finds the
//! queue idle drain it: that caller applies every queued event to the
//! [`SelectionTracker`] and then runs at most one scan. Events that arrive
//! while a scan is in progress join the queue and are handled by the same
//! drainer as the next batch, so two scans never overlap and concurrent
//! arrivals are coalesced.
//!
//! State changes are reported by the drainer to an optional
//! [`SelectionObserver`], once per batch and after the tracker lock is
//! released, so observers may query the orchestrator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::attributes::Attributes;
use crate::descriptor::Provider;
use crate::error::ConfigurationError;
use crate::event::ProviderEvent;
use crate::expression::SelectionExpression;
use crate::migration::{MigrationOptions, MigrationPort};
use crate::publication::PublicationPort;
use crate::registry::CandidateSnapshot;
use crate::tracker::{SelectionState, SelectionTracker};

const INTAKE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::intake");

/// Collaborators and pass-through settings for one orchestrator.
///
/// # Example
///
/// ```
/// use sluice_core::{MigrationOptions, OrchestratorParts};
///
/// let parts = OrchestratorParts::new("db", (), ())
///     .with_options(MigrationOptions::default().with_contexts("test"))
///     .with_instance_id("users-migration");
/// # let _ = parts;
/// ```
#[derive(Debug)]
pub struct OrchestratorParts<R, M, P> {
    pub(crate) resource: R,
    pub(crate) migration: M,
    pub(crate) publication: P,
    pub(crate) options: MigrationOptions,
    pub(crate) instance_id: Option<String>,
    pub(crate) inherited_properties: Attributes,
}

impl<R, M, P> OrchestratorParts<R, M, P> {
    /// Bundles the shared resource with the ports that act on it.
    #[must_use]
    pub fn new(resource: R, migration: M, publication: P) -> Self {
        Self {
            resource,
            migration,
            publication,
            options: MigrationOptions::default(),
            instance_id: None,
            inherited_properties: Attributes::new(),
        }
    }

    /// Options passed verbatim to every migration attempt.
    #[must_use]
    pub fn with_options(mut self, options: MigrationOptions) -> Self {
        self.options = options;
        self
    }

    /// Identity published as `service.pid` alongside the resource.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Properties the wrapped resource was itself published with.
    #[must_use]
    pub fn with_inherited_properties(mut self, properties: Attributes) -> Self {
        self.inherited_properties = properties;
        self
    }
}

/// Receives the selection state after each batch that changed it.
///
/// Called on the draining thread, in batch order. Closures taking
/// `&SelectionState` implement it.
pub trait SelectionObserver: Send + Sync {
    /// Invoked with the state a batch left behind.
    fn selection_changed(&self, state: &SelectionState);
}

impl<F> SelectionObserver for F
where
    F: Fn(&SelectionState) + Send + Sync,
{
    fn selection_changed(&self, state: &SelectionState) {
        self(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Stopped,
}

#[derive(Debug)]
struct Intake {
    queue: VecDeque<ProviderEvent>,
    draining: bool,
    lifecycle: Lifecycle,
}

/// Reacts to provider events by keeping one migrated resource published.
///
/// Built from a selection expression and [`OrchestratorParts`]. Before
/// [`start`](Self::start) events are buffered; after [`stop`](Self::stop)
/// they are dropped. Dropping the orchestrator stops it.
///
/// Migration attempts run on the thread that drains the queue and are
/// strictly sequential. No timeout is imposed on them.
pub struct Orchestrator<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    intake: Mutex<Intake>,
    tracker: Mutex<SelectionTracker<R, M, P>>,
    observer: Option<Arc<dyn SelectionObserver>>,
}

impl<R, M, P> Orchestrator<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    /// Parses `expression_text` and builds an orchestrator around `parts`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the expression is malformed.
    pub fn new(
        expression_text: &str,
        parts: OrchestratorParts<R, M, P>,
    ) -> Result<Self, ConfigurationError> {
        let expression = SelectionExpression::parse(expression_text)?;
        Ok(Self::with_expression(expression, parts))
    }

    /// Builds an orchestrator from an already parsed expression.
    #[must_use]
    pub fn with_expression(
        expression: SelectionExpression,
        parts: OrchestratorParts<R, M, P>,
    ) -> Self {
        Self {
            intake: Mutex::new(Intake {
                queue: VecDeque::new(),
                draining: false,
                lifecycle: Lifecycle::Created,
            }),
            tracker: Mutex::new(SelectionTracker::new(expression, parts)),
            observer: None,
        }
    }

    /// Registers the observer told about state changes.
    ///
    /// Replaces any earlier observer. Register before [`start`](Self::start)
    /// so buffered events are reported too.
    #[must_use]
    pub fn with_observer(mut self, observer: impl SelectionObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Begins reacting to events, applying any buffered ones as one batch.
    ///
    /// Idempotent. A stopped orchestrator cannot be restarted.
    pub fn start(&self) {
        {
            let mut intake = lock(&self.intake);
            match intake.lifecycle {
                Lifecycle::Created => intake.lifecycle = Lifecycle::Running,
                Lifecycle::Running => return,
                Lifecycle::Stopped => {
                    warn!(target: INTAKE_TARGET, "stopped orchestrator cannot be restarted");
                    return;
                }
            }
            info!(
                target: INTAKE_TARGET,
                buffered = intake.queue.len(),
                "orchestrator started"
            );
            if intake.queue.is_empty() || intake.draining {
                return;
            }
            intake.draining = true;
        }
        self.drain();
    }

    /// Submits one provider event.
    pub fn deliver(&self, event: ProviderEvent) {
        self.deliver_all([event]);
    }

    /// Submits events that should be observed by the same scan.
    ///
    /// Returns once the events are applied, unless another caller is already
    /// draining; that caller then applies them in its next batch.
    pub fn deliver_all(&self, events: impl IntoIterator<Item = ProviderEvent>) {
        {
            let mut intake = lock(&self.intake);
            if intake.lifecycle == Lifecycle::Stopped {
                let dropped = events.into_iter().count();
                debug!(
                    target: INTAKE_TARGET,
                    dropped,
                    "orchestrator stopped; events dropped"
                );
                return;
            }
            let before = intake.queue.len();
            intake.queue.extend(events);
            debug!(
                target: INTAKE_TARGET,
                queued = intake.queue.len() - before,
                "events queued"
            );
            if intake.lifecycle != Lifecycle::Running || intake.draining {
                return;
            }
            intake.draining = true;
        }
        self.drain();
    }

    /// Stops reacting to events, retracting any publication.
    ///
    /// Waits for an in-flight migration attempt to return first. Idempotent.
    pub fn stop(&self) {
        {
            let mut intake = lock(&self.intake);
            if intake.lifecycle == Lifecycle::Stopped {
                return;
            }
            intake.lifecycle = Lifecycle::Stopped;
            intake.queue.clear();
        }
        lock(&self.tracker).close();
        info!(target: INTAKE_TARGET, "orchestrator stopped");
    }

    /// Returns `true` between [`start`](Self::start) and [`stop`](Self::stop).
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.intake).lifecycle == Lifecycle::Running
    }

    /// Current selection state. Blocks while a scan is in progress.
    #[must_use]
    pub fn state(&self) -> SelectionState {
        lock(&self.tracker).state().clone()
    }

    /// Provider whose migrated resource is published, if any.
    #[must_use]
    pub fn active_provider(&self) -> Option<Provider> {
        lock(&self.tracker).active_provider().cloned()
    }

    /// Current candidates in discovery order.
    #[must_use]
    pub fn candidates(&self) -> CandidateSnapshot {
        lock(&self.tracker).candidates()
    }

    fn drain(&self) {
        let mut guard = DrainGuard {
            intake: &self.intake,
            armed: true,
        };
        loop {
            let batch: Vec<ProviderEvent> = {
                let mut intake = lock(&self.intake);
                if intake.queue.is_empty() || intake.lifecycle != Lifecycle::Running {
                    intake.draining = false;
                    guard.armed = false;
                    return;
                }
                intake.queue.drain(..).collect()
            };

            let changed = self.apply_batch(batch);
            if let (Some(observer), Some(state)) = (&self.observer, changed) {
                observer.selection_changed(&state);
            }
        }
    }

    /// Applies `batch` and scans once, returning the new state if it moved.
    fn apply_batch(&self, batch: Vec<ProviderEvent>) -> Option<SelectionState> {
        let mut tracker = lock(&self.tracker);
        let before = tracker.state().clone();
        debug!(
            target: INTAKE_TARGET,
            events = batch.len(),
            "applying event batch"
        );
        for event in batch {
            tracker.apply(event);
        }
        tracker.select_if_necessary();
        let after = tracker.state();
        (*after != before).then(|| after.clone())
    }
}

impl<R, M, P> Drop for Orchestrator<R, M, P>
where
    M: MigrationPort<R>,
    P: PublicationPort<R>,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// Releases the drainer role if a port panics mid-batch.
struct DrainGuard<'a> {
    intake: &'a Mutex<Intake>,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.intake).draining = false;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
