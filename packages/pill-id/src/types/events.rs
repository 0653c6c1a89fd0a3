//! Reported adverse reactions, alone and attached to ranked choices.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::candidate::{RankedResult, RANKED_SLOTS};

/// Entry written in place of the reactions when a choice's lookup failed.
pub const SIDE_EFFECTS_UNAVAILABLE: &str = "Could not fetch side effects";

/// Distinct reaction terms reported for a drug, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffects {
    pub drug: String,
    pub reactions: Vec<String>,
}

impl SideEffects {
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

/// Side-effect lookup outcome for one ranked slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceSideEffects {
    /// The slot held the sentinel or had no drug name; nothing was looked up.
    NotLooked,
    Found(SideEffects),
    /// The lookup failed.
    Unavailable,
}

impl ChoiceSideEffects {
    pub fn reactions(&self) -> Option<&[String]> {
        match self {
            ChoiceSideEffects::Found(effects) => Some(&effects.reactions),
            _ => None,
        }
    }
}

/// A ranked result with the reported reactions of each matched choice.
///
/// Serializes as the ranked result's flat object plus one
/// `"<n> choice side effects"` list per looked-up slot:
///
/// ```json
/// { "imprint": "TEVA+123", "color": "white", "shape": "round",
///   "1st choice": "Amoxicillin ...", "2nd choice": "N/A", "3rd choice": "N/A",
///   "1st choice side effects": ["Nausea", "Rash"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedPill {
    pub result: RankedResult,
    pub side_effects: [ChoiceSideEffects; RANKED_SLOTS],
}

impl IdentifiedPill {
    /// Key of the side-effect entry for zero-based slot `index`.
    pub fn side_effects_key(index: usize) -> String {
        format!("{} side effects", RankedResult::slot_key(index))
    }
}

impl Serialize for IdentifiedPill {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let looked_up = self
            .side_effects
            .iter()
            .filter(|e| !matches!(e, ChoiceSideEffects::NotLooked))
            .count();
        let mut map = serializer.serialize_map(Some(RankedResult::ENTRY_COUNT + looked_up))?;
        self.result.serialize_entries(&mut map)?;

        for (i, effects) in self.side_effects.iter().enumerate() {
            match effects {
                ChoiceSideEffects::NotLooked => {}
                ChoiceSideEffects::Found(found) => {
                    map.serialize_entry(&Self::side_effects_key(i), &found.reactions)?;
                }
                ChoiceSideEffects::Unavailable => {
                    map.serialize_entry(&Self::side_effects_key(i), &[SIDE_EFFECTS_UNAVAILABLE])?;
                }
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::candidate::{CandidateMatch, Choice};
    use crate::types::query::FeatureQuery;

    #[test]
    fn test_serializes_side_effects_after_slots() {
        let query = FeatureQuery::new("I-2", "white", "round").unwrap();
        let pill = IdentifiedPill {
            result: RankedResult {
                query,
                choices: [
                    Choice::Match(CandidateMatch::new("Ibuprofen Strength 200 mg")),
                    Choice::Match(CandidateMatch::new("Advil Strength 200 mg")),
                    Choice::NotAvailable,
                ],
            },
            side_effects: [
                ChoiceSideEffects::Found(SideEffects {
                    drug: "Ibuprofen".into(),
                    reactions: vec!["Nausea".into()],
                }),
                ChoiceSideEffects::Unavailable,
                ChoiceSideEffects::NotLooked,
            ],
        };

        let json = serde_json::to_value(&pill).unwrap();
        assert_eq!(json["1st choice side effects"], serde_json::json!(["Nausea"]));
        assert_eq!(
            json["2nd choice side effects"],
            serde_json::json!([SIDE_EFFECTS_UNAVAILABLE])
        );
        assert!(json.get("3rd choice side effects").is_none());
        assert_eq!(json["3rd choice"], "N/A");

        let text = serde_json::to_string(&pill).unwrap();
        assert!(text.find("\"3rd choice\"").unwrap() < text.find("\"1st choice side effects\"").unwrap());
    }
}
