//! LDAP-style attribute filters.
//!
//! Selection predicates use the RFC 1960 filter syntax familiar from service
//! platforms: `(&(version>=2)(!(vendor=acme)))`. A [`Filter`] is parsed once
//! and can then be evaluated any number of times against an [`Attributes`]
//! set. Evaluation is total: type mismatches and missing keys simply do not
//! match.

mod parser;

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::attributes::{AttributeValue, Attributes};

/// Comparison operator of a simple filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `attr=value`
    Equal,
    /// `attr~=value`
    Approx,
    /// `attr>=value`
    GreaterOrEqual,
    /// `attr<=value`
    LessOrEqual,
}

impl Comparison {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Approx => "~=",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

/// Parsed attribute filter.
///
/// # Example
///
/// ```
/// use sluice_core::{Attributes, Filter};
///
/// let filter = Filter::parse("(&(sluice.schema=users)(version>=2))")?;
/// let attributes = Attributes::new()
///     .with("sluice.schema", "users")
///     .with("version", 3_i64);
/// assert!(filter.matches(&attributes));
/// # Ok::<(), sluice_core::FilterParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every sub-filter must match.
    And(Vec<Filter>),
    /// At least one sub-filter must match.
    Or(Vec<Filter>),
    /// The sub-filter must not match.
    Not(Box<Filter>),
    /// The attribute must be present.
    Present {
        /// Attribute key.
        key: String,
    },
    /// The attribute must compare to `value` using `comparison`.
    Compare {
        /// Attribute key.
        key: String,
        /// Operator.
        comparison: Comparison,
        /// Unescaped operand text.
        value: String,
    },
    /// The textual attribute must match a wildcard pattern.
    Substring {
        /// Attribute key.
        key: String,
        /// Literal segments separated by `*` wildcards.
        pattern: SubstringPattern,
    },
}

/// Wildcard pattern of a substring filter such as `ab*cd*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringPattern {
    initial: Option<String>,
    any: Vec<String>,
    last: Option<String>,
}

impl SubstringPattern {
    fn from_segments(segments: Vec<String>) -> Self {
        let count = segments.len();
        let mut initial = None;
        let mut any = Vec::new();
        let mut last = None;
        for (index, segment) in segments.into_iter().enumerate() {
            if segment.is_empty() {
                continue;
            }
            if index == 0 {
                initial = Some(segment);
            } else if index + 1 == count {
                last = Some(segment);
            } else {
                any.push(segment);
            }
        }
        Self { initial, any, last }
    }

    fn matches(&self, text: &str) -> bool {
        let mut rest = text;
        if let Some(initial) = &self.initial {
            match rest.strip_prefix(initial.as_str()) {
                Some(remaining) => rest = remaining,
                None => return false,
            }
        }
        for segment in &self.any {
            match rest.find(segment.as_str()) {
                Some(position) => rest = rest.split_at(position + segment.len()).1,
                None => return false,
            }
        }
        match &self.last {
            Some(last) => rest.ends_with(last.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for SubstringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(initial) = &self.initial {
            write_escaped(f, initial)?;
        }
        f.write_str("*")?;
        for segment in &self.any {
            write_escaped(f, segment)?;
            f.write_str("*")?;
        }
        if let Some(last) = &self.last {
            write_escaped(f, last)?;
        }
        Ok(())
    }
}

/// Error raised when filter text is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter at offset {offset}: {message}")]
pub struct FilterParseError {
    offset: usize,
    message: String,
}

impl FilterParseError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Byte offset into the filter text where parsing failed.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Human-readable description of the problem.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl Filter {
    /// Parses filter text such as `(&(a=b)(c>=1))`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterParseError`] when the text is empty, unbalanced, uses
    /// an unknown operator or carries trailing characters.
    pub fn parse(text: &str) -> Result<Self, FilterParseError> {
        parser::parse(text)
    }

    /// Builds an equality item.
    #[must_use]
    pub fn equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Compare {
            key: key.into(),
            comparison: Comparison::Equal,
            value: value.into(),
        }
    }

    /// Evaluates the filter against an attribute set.
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Self::And(filters) => filters.iter().all(|filter| filter.matches(attributes)),
            Self::Or(filters) => filters.iter().any(|filter| filter.matches(attributes)),
            Self::Not(filter) => !filter.matches(attributes),
            Self::Present { key } => attributes.get_ignore_case(key).is_some(),
            Self::Compare {
                key,
                comparison,
                value,
            } => attributes
                .get_ignore_case(key)
                .is_some_and(|actual| compare(actual, *comparison, value)),
            Self::Substring { key, pattern } => attributes
                .get_ignore_case(key)
                .is_some_and(|actual| substring(actual, pattern)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) => write_composite(f, '&', filters),
            Self::Or(filters) => write_composite(f, '|', filters),
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Present { key } => write!(f, "({key}=*)"),
            Self::Compare {
                key,
                comparison,
                value,
            } => {
                write!(f, "({key}{}", comparison.symbol())?;
                write_escaped(f, value)?;
                f.write_str(")")
            }
            Self::Substring { key, pattern } => write!(f, "({key}={pattern})"),
        }
    }
}

fn write_composite(f: &mut fmt::Formatter<'_>, operator: char, filters: &[Filter]) -> fmt::Result {
    write!(f, "({operator}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    f.write_str(")")
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for character in value.chars() {
        if matches!(character, '(' | ')' | '*' | '\\') {
            f.write_str("\\")?;
        }
        write!(f, "{character}")?;
    }
    Ok(())
}

fn compare(actual: &AttributeValue, comparison: Comparison, operand: &str) -> bool {
    match actual {
        AttributeValue::List(values) => values
            .iter()
            .any(|value| compare(value, comparison, operand)),
        AttributeValue::String(text) => compare_text(text, comparison, operand),
        AttributeValue::Long(number) => operand
            .trim()
            .parse::<i64>()
            .is_ok_and(|expected| ordering_satisfies(number.cmp(&expected), comparison)),
        AttributeValue::Double(number) => operand
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|expected| number.partial_cmp(&expected))
            .is_some_and(|ordering| ordering_satisfies(ordering, comparison)),
        AttributeValue::Boolean(flag) => match comparison {
            Comparison::Equal | Comparison::Approx => operand
                .trim()
                .to_ascii_lowercase()
                .parse::<bool>()
                .is_ok_and(|expected| *flag == expected),
            Comparison::GreaterOrEqual | Comparison::LessOrEqual => false,
        },
    }
}

fn compare_text(text: &str, comparison: Comparison, operand: &str) -> bool {
    match comparison {
        Comparison::Approx => normalise_approx(text) == normalise_approx(operand),
        Comparison::Equal | Comparison::GreaterOrEqual | Comparison::LessOrEqual => {
            ordering_satisfies(text.cmp(operand), comparison)
        }
    }
}

fn normalise_approx(text: &str) -> String {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

const fn ordering_satisfies(ordering: Ordering, comparison: Comparison) -> bool {
    match comparison {
        Comparison::Equal | Comparison::Approx => matches!(ordering, Ordering::Equal),
        Comparison::GreaterOrEqual => !matches!(ordering, Ordering::Less),
        Comparison::LessOrEqual => !matches!(ordering, Ordering::Greater),
    }
}

fn substring(actual: &AttributeValue, pattern: &SubstringPattern) -> bool {
    match actual {
        AttributeValue::String(text) => pattern.matches(text),
        AttributeValue::List(values) => values.iter().any(|value| substring(value, pattern)),
        AttributeValue::Boolean(_) | AttributeValue::Long(_) | AttributeValue::Double(_) => false,
    }
}
