//! Drug identifiers and parsed interaction reports.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque identifier used as a join key by the interactions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrugIdentifier(String);

impl DrugIdentifier {
    /// Wrap a raw token. Returns `None` for an empty token.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrugIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One interaction entry from the report.
///
/// Any field may be absent; the source format is inconsistent and partial
/// records are kept as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// "1st interaction", "2nd interaction", ...
    #[serde(skip)]
    pub ordinal_label: String,
    pub title: Option<String>,
    pub applies_to: Option<String>,
    pub description: Option<String>,
}

/// Outcome of parsing an interactions report.
///
/// The three dead ends are valid results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionReport {
    Interactions(Vec<InteractionRecord>),
    NoSection,
    NoWrapper,
    NoInstances,
}

impl InteractionReport {
    /// Human-readable explanation for a dead end.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Interactions(_) => None,
            Self::NoSection => Some("No 'Drug and food interactions' section found on the page."),
            Self::NoWrapper => Some("Found the interactions header but no interactions list after it."),
            Self::NoInstances => Some("The interactions list contains no interaction entries."),
        }
    }

    pub fn records(&self) -> &[InteractionRecord] {
        match self {
            Self::Interactions(records) => records,
            _ => &[],
        }
    }
}

impl Serialize for InteractionReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Interactions(records) => {
                let mut map = serializer.serialize_map(Some(records.len()))?;
                for record in records {
                    map.serialize_entry(&record.ordinal_label, record)?;
                }
                map.end()
            }
            _ => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("message", &self.message())?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rejects_empty() {
        assert!(DrugIdentifier::new("").is_none());
        assert!(DrugIdentifier::new("  ").is_none());
        assert_eq!(DrugIdentifier::new("243-0").unwrap().as_str(), "243-0");
    }

    #[test]
    fn test_dead_end_serializes_as_message() {
        let json = serde_json::to_value(InteractionReport::NoSection).unwrap();
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("No 'Drug and food interactions' section found"));
    }

    #[test]
    fn test_records_keyed_by_ordinal() {
        let report = InteractionReport::Interactions(vec![InteractionRecord {
            ordinal_label: "1st interaction".into(),
            title: Some("Ibuprofen food".into()),
            applies_to: None,
            description: Some("Take with food.".into()),
        }]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["1st interaction"]["title"], "Ibuprofen food");
        assert!(json["1st interaction"]["applies_to"].is_null());
        assert!(report.message().is_none());
    }
}
