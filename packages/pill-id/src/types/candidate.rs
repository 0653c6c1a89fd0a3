//! Candidate matches and the fixed-arity ranked result.

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::LazyLock;

use super::query::FeatureQuery;

/// Sentinel stored in an empty result slot.
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of slots in a [`RankedResult`].
pub const RANKED_SLOTS: usize = 3;

/// Display text of one matched entry's container.
///
/// The reference site offers no machine-readable structure, so the text is
/// kept opaque. [`CandidateMatch::details`] makes a best-effort split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateMatch(String);

impl CandidateMatch {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// True when the container had no visible text.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// First word of the display text, usually the drug name.
    pub fn drug_name(&self) -> Option<&str> {
        self.0.split_whitespace().next()
    }

    /// Split the display text on the labels the reference site prints.
    pub fn details(&self) -> CandidateDetails {
        CandidateDetails::parse(&self.0)
    }
}

static RE_STRENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Strength\s+(.*?)\s+Imprint").unwrap());
static RE_IMPRINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Imprint\s+(.*?)\s+Color").unwrap());
static RE_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Color\s+(.*?)\s+Shape").unwrap());
static RE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Shape\s+(.*?)(?:\s+View details|$)").unwrap());

/// Labeled fields recovered from a candidate's display text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDetails {
    pub name: Option<String>,
    pub strength: Option<String>,
    pub imprint: Option<String>,
    pub color: Option<String>,
    pub shape: Option<String>,
}

impl CandidateDetails {
    /// Parse `"<name> Strength <s> Imprint <i> Color <c> Shape <sh> View details"`.
    pub fn parse(text: &str) -> Self {
        let name = text
            .split("Strength")
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            name,
            strength: capture(&RE_STRENGTH),
            imprint: capture(&RE_IMPRINT),
            color: capture(&RE_COLOR),
            shape: capture(&RE_SHAPE),
        }
    }
}

/// One slot of a ranked result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Match(CandidateMatch),
    NotAvailable,
}

impl Choice {
    pub fn as_match(&self) -> Option<&CandidateMatch> {
        match self {
            Choice::Match(m) => Some(m),
            Choice::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Choice::Match(_))
    }

    /// Display text, or the sentinel.
    pub fn text(&self) -> &str {
        match self {
            Choice::Match(m) => m.text(),
            Choice::NotAvailable => NOT_AVAILABLE,
        }
    }
}

/// Top candidates for a query, always exactly [`RANKED_SLOTS`] slots.
///
/// Serializes to a flat object with fixed keys so consumers can address
/// slots directly:
///
/// ```json
/// { "imprint": "TEVA+123", "color": "white", "shape": "round",
///   "1st choice": "...", "2nd choice": "...", "3rd choice": "N/A" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedResult {
    pub query: FeatureQuery,
    pub choices: [Choice; RANKED_SLOTS],
}

impl RankedResult {
    /// Result with every slot set to the sentinel.
    pub fn empty(query: FeatureQuery) -> Self {
        Self {
            query,
            choices: [Choice::NotAvailable, Choice::NotAvailable, Choice::NotAvailable],
        }
    }

    /// Number of populated slots.
    pub fn available(&self) -> usize {
        self.choices.iter().filter(|c| c.is_available()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Populated slots in rank order.
    pub fn matches(&self) -> impl Iterator<Item = &CandidateMatch> {
        self.choices.iter().filter_map(Choice::as_match)
    }

    /// Fixed key for a slot index (0-based).
    pub fn slot_key(index: usize) -> String {
        format!("{} choice", crate::pipeline::interactions::ordinal(index + 1))
    }
}

impl RankedResult {
    /// Number of entries written by [`Self::serialize_entries`].
    pub(crate) const ENTRY_COUNT: usize = 3 + RANKED_SLOTS;

    /// Write the fixed keys into an open map, so wrappers can append their own.
    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("imprint", self.query.imprint())?;
        map.serialize_entry("color", self.query.color())?;
        map.serialize_entry("shape", self.query.shape())?;
        for (i, choice) in self.choices.iter().enumerate() {
            map.serialize_entry(&Self::slot_key(i), choice.text())?;
        }
        Ok(())
    }
}

impl Serialize for RankedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Self::ENTRY_COUNT))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Ibuprofen Strength 200 mg Imprint I-2 Color Brown Shape Round View details";

    #[test]
    fn test_details_parse_all_fields() {
        let details = CandidateMatch::new(SAMPLE).details();
        assert_eq!(details.name.as_deref(), Some("Ibuprofen"));
        assert_eq!(details.strength.as_deref(), Some("200 mg"));
        assert_eq!(details.imprint.as_deref(), Some("I-2"));
        assert_eq!(details.color.as_deref(), Some("Brown"));
        assert_eq!(details.shape.as_deref(), Some("Round"));
    }

    #[test]
    fn test_details_tolerates_missing_labels() {
        let details = CandidateDetails::parse("Mystery pill");
        assert_eq!(details.name.as_deref(), Some("Mystery pill"));
        assert!(details.strength.is_none());
        assert!(details.shape.is_none());
    }

    #[test]
    fn test_drug_name_is_first_word() {
        assert_eq!(CandidateMatch::new(SAMPLE).drug_name(), Some("Ibuprofen"));
        assert_eq!(CandidateMatch::new("   ").drug_name(), None);
    }

    #[test]
    fn test_serializes_fixed_keys() {
        let query = FeatureQuery::new("I 2", "brown", "round").unwrap();
        let mut result = RankedResult::empty(query);
        result.choices[0] = Choice::Match(CandidateMatch::new(SAMPLE));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["imprint"], "I+2");
        assert_eq!(json["1st choice"], SAMPLE);
        assert_eq!(json["2nd choice"], NOT_AVAILABLE);
        assert_eq!(json["3rd choice"], NOT_AVAILABLE);
        assert_eq!(result.available(), 1);
    }
}
