//! Unit tests for the candidate registry.

use rstest::{fixture, rstest};

use super::*;
use crate::attributes::{ATTR_SCHEMA_NAME, ATTR_SCHEMA_RESOURCE, Attributes};
use crate::expression::SelectionExpression;

fn descriptor(schema: &str, version: i64) -> CapabilityDescriptor {
    CapabilityDescriptor::from_attributes(
        Attributes::new()
            .with(ATTR_SCHEMA_NAME, schema)
            .with(ATTR_SCHEMA_RESOURCE, format!("db/{schema}-{version}.xml"))
            .with("version", version),
    )
    .expect("valid descriptor")
}

#[fixture]
fn registry() -> CandidateRegistry {
    let expression =
        SelectionExpression::parse("users;filter:=(version>=2)").expect("valid expression");
    CandidateRegistry::new(Arc::new(expression))
}

fn ids(registry: &CandidateRegistry) -> Vec<String> {
    registry
        .snapshot()
        .iter()
        .map(|candidate| candidate.id().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Upsert
// ---------------------------------------------------------------------------

#[rstest]
fn inserts_in_discovery_order(mut registry: CandidateRegistry) {
    for id in ["p3", "p1", "p2"] {
        let outcome = registry.upsert(Provider::new(id), Some(descriptor("users", 2)));
        assert_eq!(outcome, UpsertOutcome::Inserted);
    }
    assert_eq!(ids(&registry), ["p3", "p1", "p2"]);
}

#[rstest]
#[case::no_descriptor(None)]
#[case::wrong_schema(Some(descriptor("orders", 5)))]
#[case::predicate_fails(Some(descriptor("users", 1)))]
fn ignores_non_matching_unknown_provider(
    mut registry: CandidateRegistry,
    #[case] candidate: Option<CapabilityDescriptor>,
) {
    assert_eq!(
        registry.upsert(Provider::new("p1"), candidate),
        UpsertOutcome::Ignored
    );
    assert!(registry.is_empty());
}

#[rstest]
fn replacement_keeps_position(mut registry: CandidateRegistry) {
    for id in ["p1", "p2", "p3"] {
        registry.upsert(Provider::new(id), Some(descriptor("users", 2)));
    }

    let outcome = registry.upsert(Provider::new("p1"), Some(descriptor("users", 3)));

    assert_eq!(outcome, UpsertOutcome::Replaced);
    assert_eq!(ids(&registry), ["p1", "p2", "p3"]);
    let replaced = registry
        .get(&ProviderId::new("p1"))
        .expect("p1 is a candidate");
    assert_eq!(replaced.descriptor().resource_locator(), "db/users-3.xml");
}

#[rstest]
fn provenance_change_counts_as_replacement(mut registry: CandidateRegistry) {
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    let outcome = registry.upsert(
        Provider::new("p1").with_version("2.0.0"),
        Some(descriptor("users", 2)),
    );
    assert_eq!(outcome, UpsertOutcome::Replaced);
}

#[rstest]
fn identical_upsert_is_unchanged(mut registry: CandidateRegistry) {
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    let outcome = registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    assert_eq!(outcome, UpsertOutcome::Unchanged);
    assert!(!outcome.changed());
}

#[rstest]
fn no_longer_matching_descriptor_removes(mut registry: CandidateRegistry) {
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    registry.upsert(Provider::new("p2"), Some(descriptor("users", 2)));

    let outcome = registry.upsert(Provider::new("p1"), Some(descriptor("users", 1)));

    assert_eq!(outcome, UpsertOutcome::Removed);
    assert_eq!(ids(&registry), ["p2"]);
}

// ---------------------------------------------------------------------------
// Removal and snapshots
// ---------------------------------------------------------------------------

#[rstest]
fn removal_closes_the_gap_and_is_idempotent(mut registry: CandidateRegistry) {
    for id in ["p1", "p2", "p3"] {
        registry.upsert(Provider::new(id), Some(descriptor("users", 2)));
    }
    let p2 = ProviderId::new("p2");

    assert!(registry.remove(&p2).is_some());
    assert!(registry.remove(&p2).is_none());
    assert!(!registry.contains(&p2));
    assert_eq!(ids(&registry), ["p1", "p3"]);
}

#[rstest]
fn reinserted_provider_goes_to_the_back(mut registry: CandidateRegistry) {
    for id in ["p1", "p2"] {
        registry.upsert(Provider::new(id), Some(descriptor("users", 2)));
    }
    registry.remove(&ProviderId::new("p1"));
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    assert_eq!(ids(&registry), ["p2", "p1"]);
}

#[rstest]
fn snapshot_is_isolated_from_later_changes(mut registry: CandidateRegistry) {
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    let snapshot = registry.snapshot();

    registry.upsert(Provider::new("p2"), Some(descriptor("users", 2)));
    registry.remove(&ProviderId::new("p1"));

    assert_eq!(snapshot.ids(), [ProviderId::new("p1")]);
    assert_eq!(registry.snapshot().ids(), [ProviderId::new("p2")]);
}

#[rstest]
fn snapshot_can_be_iterated_twice(mut registry: CandidateRegistry) {
    for id in ["p1", "p2"] {
        registry.upsert(Provider::new(id), Some(descriptor("users", 2)));
    }
    let snapshot = registry.snapshot();
    let first: Vec<_> = snapshot.iter().map(Candidate::id).collect();
    let second: Vec<_> = (&snapshot).into_iter().map(Candidate::id).collect();
    assert_eq!(first, second);
}

#[rstest]
fn clear_empties_registry(mut registry: CandidateRegistry) {
    registry.upsert(Provider::new("p1"), Some(descriptor("users", 2)));
    registry.clear();
    assert!(registry.is_empty());
    assert!(registry.snapshot().is_empty());
}
