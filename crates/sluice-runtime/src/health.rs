//! Structured health reporting for component lifecycle events.

use std::sync::Arc;

use sluice_config::Config;
use sluice_core::SelectionState;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn activation_starting(&self);

    /// Invoked after the orchestrator has started.
    fn activation_succeeded(&self, config: &Config);

    /// Invoked when activation fails.
    fn activation_failed(&self, error: &BootstrapError);

    /// Invoked after an applied batch moved the selection to a new state.
    fn selection_changed(&self, state: &SelectionState);

    /// Invoked once the component has been deactivated.
    fn deactivated(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn activation_starting(&self) {
        (**self).activation_starting();
    }

    fn activation_succeeded(&self, config: &Config) {
        (**self).activation_succeeded(config);
    }

    fn activation_failed(&self, error: &BootstrapError) {
        (**self).activation_failed(error);
    }

    fn selection_changed(&self, state: &SelectionState) {
        (**self).selection_changed(state);
    }

    fn deactivated(&self) {
        (**self).deactivated();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn activation_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "activation_starting",
            "activating migration component"
        );
    }

    fn activation_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "activation_succeeded",
            expression = config.selection_expression().unwrap_or_default(),
            instance_id = config.instance_id().unwrap_or_default(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "migration component active"
        );
    }

    fn activation_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "activation_failed",
            error = %error,
            "migration component failed to activate"
        );
    }

    fn selection_changed(&self, state: &SelectionState) {
        match state {
            SelectionState::Unfulfilled { candidates } => tracing::warn!(
                target: HEALTH_TARGET,
                event = "selection_changed",
                candidates,
                "no candidate could migrate the resource"
            ),
            SelectionState::Active { provider } => tracing::info!(
                target: HEALTH_TARGET,
                event = "selection_changed",
                provider = %provider,
                "migrated resource published"
            ),
            SelectionState::Idle | SelectionState::Selecting => tracing::info!(
                target: HEALTH_TARGET,
                event = "selection_changed",
                state = ?state,
                "no migrated resource published"
            ),
        }
    }

    fn deactivated(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "deactivated",
            "migration component deactivated"
        );
    }
}
