//! Ordered registry of candidate providers.
//!
//! The [`CandidateRegistry`] keeps every provider whose descriptor currently
//! passes the [`ProviderFilter`], in discovery order. Discovery order is the
//! fallback priority: the first-discovered candidate is tried first. Updating
//! a known provider keeps its original position; removing it closes the gap.

use std::fmt;
use std::slice;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::{CapabilityDescriptor, Provider, ProviderId};
use crate::expression::ProviderFilter;

/// A provider whose descriptor matches the selection expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    provider: Provider,
    descriptor: Arc<CapabilityDescriptor>,
}

impl Candidate {
    /// The provider offering the schema.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Identity of the provider.
    #[must_use]
    pub const fn id(&self) -> &ProviderId {
        self.provider.id()
    }

    /// The matching descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }
}

/// Result of [`CandidateRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new candidate was appended.
    Inserted,
    /// A known candidate changed in place.
    Replaced,
    /// A known candidate was re-submitted with identical content.
    Unchanged,
    /// A known provider no longer matches and was dropped.
    Removed,
    /// An unknown provider did not match; nothing changed.
    Ignored,
}

impl UpsertOutcome {
    /// Returns `true` when the registry contents changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Removed)
    }
}

/// Candidates keyed by provider identity, in discovery order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sluice_core::{
///     Attributes, CandidateRegistry, CapabilityDescriptor, Provider, SelectionExpression,
///     UpsertOutcome,
/// };
///
/// let expression = SelectionExpression::parse("users")?;
/// let mut registry = CandidateRegistry::new(Arc::new(expression));
/// let descriptor = CapabilityDescriptor::from_attributes(
///     Attributes::new()
///         .with("sluice.schema", "users")
///         .with("resource", "db/users.xml"),
/// )
/// .expect("valid descriptor");
///
/// let outcome = registry.upsert(Provider::new("p1"), Some(descriptor));
/// assert_eq!(outcome, UpsertOutcome::Inserted);
/// assert_eq!(registry.len(), 1);
/// # Ok::<(), sluice_core::ConfigurationError>(())
/// ```
pub struct CandidateRegistry {
    filter: Arc<dyn ProviderFilter>,
    candidates: IndexMap<ProviderId, Candidate>,
}

impl CandidateRegistry {
    /// Creates an empty registry admitting descriptors accepted by `filter`.
    #[must_use]
    pub fn new(filter: Arc<dyn ProviderFilter>) -> Self {
        Self {
            filter,
            candidates: IndexMap::new(),
        }
    }

    /// Inserts, replaces or drops the candidate for `provider`.
    ///
    /// A missing or non-matching descriptor behaves like
    /// [`remove`](Self::remove). A known provider keeps its position.
    pub fn upsert(
        &mut self,
        provider: Provider,
        descriptor: Option<CapabilityDescriptor>,
    ) -> UpsertOutcome {
        let Some(descriptor) = descriptor.filter(|descriptor| self.filter.matches(descriptor))
        else {
            return match self.remove(provider.id()) {
                Some(_) => UpsertOutcome::Removed,
                None => UpsertOutcome::Ignored,
            };
        };

        if let Some(existing) = self.candidates.get_mut(provider.id()) {
            if existing.provider == provider && *existing.descriptor == descriptor {
                return UpsertOutcome::Unchanged;
            }
            existing.provider = provider;
            existing.descriptor = Arc::new(descriptor);
            return UpsertOutcome::Replaced;
        }

        let id = provider.id().clone();
        self.candidates.insert(
            id,
            Candidate {
                provider,
                descriptor: Arc::new(descriptor),
            },
        );
        UpsertOutcome::Inserted
    }

    /// Removes the candidate for `id`, if present.
    pub fn remove(&mut self, id: &ProviderId) -> Option<Candidate> {
        self.candidates.shift_remove(id)
    }

    /// Looks up a candidate by provider identity.
    #[must_use]
    pub fn get(&self, id: &ProviderId) -> Option<&Candidate> {
        self.candidates.get(id)
    }

    /// Returns `true` when `id` is a current candidate.
    #[must_use]
    pub fn contains(&self, id: &ProviderId) -> bool {
        self.candidates.contains_key(id)
    }

    /// Copies the current candidates, in order, into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CandidateSnapshot {
        CandidateSnapshot {
            candidates: self.candidates.values().cloned().collect(),
        }
    }

    /// Drops every candidate.
    pub fn clear(&mut self) {
        self.candidates.clear();
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns `true` when no provider currently matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl fmt::Debug for CandidateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateRegistry")
            .field("candidates", &self.candidates.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Immutable, restartable view of the registry at one point in time.
///
/// Cloning is cheap; later registry changes never show through.
#[derive(Debug, Clone, Default)]
pub struct CandidateSnapshot {
    candidates: Arc<[Candidate]>,
}

impl CandidateSnapshot {
    /// Iterates candidates in discovery order.
    pub fn iter(&self) -> slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    /// Identities in discovery order.
    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> {
        self.candidates.iter().map(|c| c.id().clone()).collect()
    }

    /// Number of candidates captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns `true` when the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> IntoIterator for &'a CandidateSnapshot {
    type Item = &'a Candidate;
    type IntoIter = slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

#[cfg(test)]
mod tests;
