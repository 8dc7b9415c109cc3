//! Closed vocabularies accepted from configuration layers.
//!
//! Values parse case-insensitively from CLI flags, `SLUICE_*` variables and
//! `sluice.toml`, and render in snake case.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rejection of a value outside one of these vocabularies.
pub type ChoiceParseError = strum::ParseError;

/// Shape of the lines the component's tracing subscriber writes to stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for log shippers.
    #[default]
    Json,
    /// Terse text lines for an operator's terminal.
    Compact,
}

/// How the migration engine quotes database object names.
///
/// The engine receives the upper snake case name returned by
/// [`ObjectQuotingStrategy::engine_name`].
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ObjectQuotingStrategy {
    /// Quote only where the database requires it.
    Legacy,
    /// Quote every object name.
    QuoteAllObjects,
    /// Quote only names that collide with reserved words.
    QuoteOnlyReservedWords,
}

impl ObjectQuotingStrategy {
    /// Name understood by the migration engine.
    #[must_use]
    pub const fn engine_name(self) -> &'static str {
        match self {
            Self::Legacy => "LEGACY",
            Self::QuoteAllObjects => "QUOTE_ALL_OBJECTS",
            Self::QuoteOnlyReservedWords => "QUOTE_ONLY_RESERVED_WORDS",
        }
    }
}
