//! Provider identity and capability descriptors.
//!
//! A provider is an opaque, discoverable unit (a plugin, a bundle, a package)
//! that can ship migration scripts. Each schema it offers is described by a
//! [`CapabilityDescriptor`] extracted from an attribute set in the
//! [`SCHEMA_NAMESPACE`](crate::attributes::SCHEMA_NAMESPACE).

use std::fmt;
use std::sync::Arc;

use crate::attributes::{ATTR_SCHEMA_NAME, ATTR_SCHEMA_RESOURCE, AttributeValue, Attributes};
use crate::error::DescriptorError;

/// Stable identity of a provider.
///
/// # Example
///
/// ```
/// use sluice_core::ProviderId;
///
/// let id = ProviderId::new("bundle-17");
/// assert_eq!(id.as_str(), "bundle-17");
/// assert_eq!(id, ProviderId::from("bundle-17"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(Arc<str>);

impl ProviderId {
    /// Wraps an identity string.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns the identity as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// A provider together with the provenance published alongside a migration.
///
/// # Example
///
/// ```
/// use sluice_core::Provider;
///
/// let provider = Provider::new("bundle-17")
///     .with_name("com.example.users")
///     .with_version("1.4.0");
/// assert_eq!(provider.name(), Some("com.example.users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    id: ProviderId,
    name: Option<String>,
    version: Option<String>,
}

impl Provider {
    /// Creates a provider with only an identity.
    #[must_use]
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
        }
    }

    /// Sets the provider's symbolic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the provider's version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Stable identity.
    #[must_use]
    pub const fn id(&self) -> &ProviderId {
        &self.id
    }

    /// Symbolic name, when known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Version, when known.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.version) {
            (Some(name), Some(version)) => write!(f, "{name} {version} [{}]", self.id),
            (Some(name), None) => write!(f, "{name} [{}]", self.id),
            (None, _) => write!(f, "[{}]", self.id),
        }
    }
}

/// One schema offered by a provider.
///
/// Immutable once extracted. The full attribute set is retained so
/// predicates can refer to any advertised attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDescriptor {
    schema_name: String,
    resource_locator: String,
    attributes: Attributes,
}

impl CapabilityDescriptor {
    /// Extracts a descriptor from an advertised attribute set.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the schema name or resource locator
    /// is missing, not textual, or blank.
    ///
    /// # Example
    ///
    /// ```
    /// use sluice_core::{Attributes, CapabilityDescriptor};
    ///
    /// let descriptor = CapabilityDescriptor::from_attributes(
    ///     Attributes::new()
    ///         .with("sluice.schema", "users")
    ///         .with("resource", "db/changelog.xml"),
    /// )?;
    /// assert_eq!(descriptor.resource_locator(), "db/changelog.xml");
    /// # Ok::<(), sluice_core::DescriptorError>(())
    /// ```
    pub fn from_attributes(attributes: Attributes) -> Result<Self, DescriptorError> {
        let schema_name = required_text(&attributes, ATTR_SCHEMA_NAME)?.to_owned();
        let resource_locator = required_text(&attributes, ATTR_SCHEMA_RESOURCE)?.to_owned();
        Ok(Self {
            schema_name,
            resource_locator,
            attributes,
        })
    }

    /// Advertised schema name; the first name of a multi-valued attribute.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        self.schema_name.as_str()
    }

    /// Locator of the migration script within the provider.
    #[must_use]
    pub fn resource_locator(&self) -> &str {
        self.resource_locator.as_str()
    }

    /// Every advertised attribute, including name and locator.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

fn required_text<'a>(attributes: &'a Attributes, key: &str) -> Result<&'a str, DescriptorError> {
    let text = match attributes.get_ignore_case(key) {
        None => {
            return Err(DescriptorError::MissingAttribute {
                attribute: key.to_owned(),
            });
        }
        Some(AttributeValue::String(text)) => Some(text.as_str()),
        Some(AttributeValue::List(values)) => first_text(values),
        Some(_) => None,
    };
    match text {
        None => Err(DescriptorError::NotAString {
            attribute: key.to_owned(),
        }),
        Some(text) if text.trim().is_empty() => Err(DescriptorError::Blank {
            attribute: key.to_owned(),
        }),
        Some(text) => Ok(text),
    }
}

/// First non-blank text of a multi-valued attribute, else its first text.
fn first_text(values: &[AttributeValue]) -> Option<&str> {
    let mut texts = values.iter().filter_map(AttributeValue::as_str);
    let first = texts.clone().next();
    texts.find(|text| !text.trim().is_empty()).or(first)
}
