//! Boundary to whatever exposes the migrated resource to dependents.
//!
//! After a successful migration the orchestrator calls
//! [`PublicationPort::publish`] exactly once and holds the returned handle
//! until the selection is lost, at which point the handle is passed back to
//! [`PublicationPort::retract`]. At most one handle is live per orchestrator.

use std::sync::Arc;

use crate::attributes::{Attributes, SCHEMA_NAMESPACE};
use crate::descriptor::Provider;

/// Property carrying the publishing instance's persistent identity.
pub const PROP_SERVICE_PID: &str = "service.pid";
/// Property carrying the runtime identity of a published resource.
pub const PROP_SERVICE_ID: &str = "service.id";
/// Prefix applied to identity properties inherited from the wrapped resource.
pub const WRAPPED_PREFIX: &str = "wrapped.";

/// Exposes and withdraws the migrated resource.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use sluice_core::{PublicationMetadata, PublicationPort};
///
/// struct Database;
/// #[derive(Default)]
/// struct Counter(AtomicU64);
///
/// impl PublicationPort<Database> for Counter {
///     type Handle = u64;
///
///     fn publish(&self, _resource: &Database, _metadata: PublicationMetadata) -> u64 {
///         self.0.fetch_add(1, Ordering::SeqCst)
///     }
///
///     fn retract(&self, _handle: u64) {}
/// }
/// ```
pub trait PublicationPort<R: ?Sized>: Send + Sync {
    /// Token identifying one publication.
    type Handle: Send;

    /// Makes `resource` available, tagged with `metadata`.
    fn publish(&self, resource: &R, metadata: PublicationMetadata) -> Self::Handle;

    /// Withdraws a publication previously returned by [`publish`](Self::publish).
    fn retract(&self, handle: Self::Handle);
}

impl<R: ?Sized, T: PublicationPort<R> + ?Sized> PublicationPort<R> for Arc<T> {
    type Handle = T::Handle;

    fn publish(&self, resource: &R, metadata: PublicationMetadata) -> Self::Handle {
        (**self).publish(resource, metadata)
    }

    fn retract(&self, handle: Self::Handle) {
        (**self).retract(handle);
    }
}

/// Provenance attached to a published resource.
///
/// Subscribers filter on these values to wait for a resource migrated by a
/// particular provider or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationMetadata {
    provider: Provider,
    schema_name: String,
    resource_locator: String,
    expression: String,
    instance_id: Option<String>,
    inherited: Attributes,
}

impl PublicationMetadata {
    /// Creates metadata for a migration that succeeded with `provider`.
    #[must_use]
    pub fn new(
        provider: Provider,
        schema_name: impl Into<String>,
        resource_locator: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            schema_name: schema_name.into(),
            resource_locator: resource_locator.into(),
            expression: expression.into(),
            instance_id: None,
            inherited: Attributes::new(),
        }
    }

    /// Sets the identity of the publishing instance.
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: Option<String>) -> Self {
        self.instance_id = instance_id;
        self
    }

    /// Sets the properties the wrapped resource was published with.
    #[must_use]
    pub fn with_inherited(mut self, inherited: Attributes) -> Self {
        self.inherited = inherited;
        self
    }

    /// The winning provider.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Schema name of the winning capability.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// Locator of the applied script.
    #[must_use]
    pub fn resource_locator(&self) -> &str {
        &self.resource_locator
    }

    /// The selection expression exactly as configured.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Identity of the publishing instance, when configured.
    #[must_use]
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Flattens the metadata into publication properties.
    ///
    /// Inherited properties come first. The wrapped resource's
    /// `service.id` and `service.pid` move under the `wrapped.` prefix, and
    /// provenance keys overwrite anything inherited under the same name.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_core::{Attributes, Provider, PublicationMetadata};
    ///
    /// let metadata = PublicationMetadata::new(
    ///     Provider::new("p2").with_name("users-bundle"),
    ///     "users",
    ///     "db/users.xml",
    ///     "users;filter:=(version>=2)",
    /// )
    /// .with_inherited(Attributes::new().with("service.pid", "pool-1"));
    ///
    /// let properties = metadata.to_properties();
    /// assert_eq!(properties.get_str("sluice.schema.provider.id"), Some("p2"));
    /// assert_eq!(properties.get_str("wrapped.service.pid"), Some("pool-1"));
    /// assert!(!properties.contains_key("service.pid"));
    /// ```
    #[must_use]
    pub fn to_properties(&self) -> Attributes {
        let mut properties: Attributes = self
            .inherited
            .iter()
            .filter(|(key, _)| !is_identity_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for key in [PROP_SERVICE_ID, PROP_SERVICE_PID] {
            if let Some(value) = self.inherited.get(key) {
                properties.insert(format!("{WRAPPED_PREFIX}{key}"), value.clone());
            }
        }

        if let Some(instance_id) = &self.instance_id {
            properties.insert(PROP_SERVICE_PID, instance_id.as_str());
        }
        properties.insert(provenance_key("provider.id"), self.provider.id().as_str());
        if let Some(name) = self.provider.name() {
            properties.insert(provenance_key("provider.name"), name);
        }
        if let Some(version) = self.provider.version() {
            properties.insert(provenance_key("provider.version"), version);
        }
        properties.insert(provenance_key("name"), self.schema_name.as_str());
        properties.insert(provenance_key("expression"), self.expression.as_str());
        properties.insert(provenance_key("resource"), self.resource_locator.as_str());
        properties
    }
}

fn is_identity_key(key: &str) -> bool {
    key == PROP_SERVICE_ID || key == PROP_SERVICE_PID
}

fn provenance_key(suffix: &str) -> String {
    format!("{SCHEMA_NAMESPACE}.{suffix}")
}
