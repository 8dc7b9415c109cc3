//! Provider lifecycle events consumed by the orchestrator.

use crate::attributes::Attributes;
use crate::descriptor::{Provider, ProviderId};

/// Point-in-time view of a provider and the schema capabilities it offers.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSnapshot {
    provider: Provider,
    capabilities: Vec<Attributes>,
}

impl ProviderSnapshot {
    /// Creates a snapshot offering no capabilities.
    #[must_use]
    pub const fn new(provider: Provider) -> Self {
        Self {
            provider,
            capabilities: Vec::new(),
        }
    }

    /// Adds an attribute set advertised in the schema namespace.
    #[must_use]
    pub fn with_capability(mut self, attributes: Attributes) -> Self {
        self.capabilities.push(attributes);
        self
    }

    /// The provider.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Advertised capabilities in declaration order.
    #[must_use]
    pub fn capabilities(&self) -> &[Attributes] {
        &self.capabilities
    }
}

/// A change in the provider population.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A provider became available.
    Added(ProviderSnapshot),
    /// An available provider changed what it advertises.
    Changed(ProviderSnapshot),
    /// A provider went away.
    Removed(ProviderId),
}

impl ProviderEvent {
    /// Identity of the provider the event concerns.
    #[must_use]
    pub const fn provider_id(&self) -> &ProviderId {
        match self {
            Self::Added(snapshot) | Self::Changed(snapshot) => snapshot.provider.id(),
            Self::Removed(id) => id,
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Changed(_) => "changed",
            Self::Removed(_) => "removed",
        }
    }
}
