//! Crate-level integration and BDD tests.

use std::sync::Arc;

use crate::descriptor::{CapabilityDescriptor, Provider};
use crate::event::{ProviderEvent, ProviderSnapshot};
use crate::expression::SelectionExpression;
use crate::orchestrator::Orchestrator;
use crate::registry::CandidateRegistry;
use crate::tracker::SelectionState;

use support::{Ports, capability};

pub(crate) mod support;

const EXPRESSION: &str = "users;filter:=(&(version>=2)(!(vendor=legacy)))";

fn population() -> Vec<ProviderSnapshot> {
    vec![
        ProviderSnapshot::new(Provider::new("legacy"))
            .with_capability(capability("users", 3).with("vendor", "legacy")),
        ProviderSnapshot::new(Provider::new("old")).with_capability(capability("users", 1)),
        ProviderSnapshot::new(Provider::new("current")).with_capability(capability("users", 2)),
    ]
}

#[test]
fn registry_and_orchestrator_agree_on_candidates() {
    let parsed = SelectionExpression::parse(EXPRESSION).expect("valid expression");
    let mut registry = CandidateRegistry::new(Arc::new(parsed));
    for snapshot in population() {
        let descriptor = snapshot
            .capabilities()
            .first()
            .cloned()
            .and_then(|attributes| CapabilityDescriptor::from_attributes(attributes).ok());
        registry.upsert(snapshot.provider().clone(), descriptor);
    }

    let ports = Ports::new();
    let orchestrator = Orchestrator::new(EXPRESSION, ports.parts()).expect("valid expression");
    orchestrator.start();
    orchestrator.deliver_all(population().into_iter().map(ProviderEvent::Added));

    assert_eq!(registry.snapshot().ids(), orchestrator.candidates().ids());
    assert_eq!(
        orchestrator.state(),
        SelectionState::Active {
            provider: "current".into()
        }
    );
    assert_eq!(ports.journal.attempts(), ["current"]);
}
