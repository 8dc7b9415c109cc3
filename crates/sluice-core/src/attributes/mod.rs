//! Attribute sets advertised by providers.
//!
//! Providers describe each schema they offer with a flat, string-keyed set of
//! typed values. The selection predicate is evaluated against these sets, and
//! the same representation is reused for the properties attached to a
//! publication.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Namespace under which providers advertise migratable schemas.
pub const SCHEMA_NAMESPACE: &str = "sluice.schema";

/// Attribute carrying the advertised schema name.
pub const ATTR_SCHEMA_NAME: &str = SCHEMA_NAMESPACE;

/// Attribute carrying the locator of the migration script inside the provider.
pub const ATTR_SCHEMA_RESOURCE: &str = "resource";

/// A single typed attribute value.
///
/// # Example
///
/// ```
/// use sluice_core::AttributeValue;
///
/// let value = AttributeValue::from(42_i64);
/// assert_eq!(value.to_string(), "42");
/// assert_eq!(AttributeValue::from("users").as_str(), Some("users"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean flag.
    Boolean(bool),
    /// Signed integer.
    Long(i64),
    /// Floating point number.
    Double(f64),
    /// Free-form text.
    String(String),
    /// Multi-valued attribute; filters match when any element matches.
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Returns the string payload when the value is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            Self::Boolean(_) | Self::Long(_) | Self::Double(_) | Self::List(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
            Self::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered, string-keyed attribute set.
///
/// Keys keep their original spelling; [`Attributes::get_ignore_case`] offers
/// the case-insensitive lookup used by filter evaluation.
///
/// # Example
///
/// ```
/// use sluice_core::Attributes;
///
/// let attributes = Attributes::new()
///     .with("sluice.schema", "users")
///     .with("Version", 3_i64);
/// assert!(attributes.get_ignore_case("version").is_some());
/// assert!(attributes.get("version").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    /// Creates an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, returning the updated set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces an attribute, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Looks up an attribute by its exact key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    /// Looks up an attribute ignoring ASCII case, preferring an exact match.
    #[must_use]
    pub fn get_ignore_case(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
    }

    /// Returns the textual value stored under `key`, if any.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    /// Returns `true` when an attribute exists under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over attributes in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, AttributeValue> {
        self.entries.iter()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the set holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a String, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
