//! Adverse event lookup: distinct reaction terms reported for a drug.

use indexmap::IndexSet;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::labeling::sanitize_term;
use crate::error::Result;
use crate::traits::source::{StructuredEndpoint, StructuredSource};
use crate::types::events::SideEffects;

/// Collects reported reactions from drug-event reports.
#[derive(Clone)]
pub struct SideEffectLookup {
    source: Arc<dyn StructuredSource>,
}

impl SideEffectLookup {
    pub fn new(source: Arc<dyn StructuredSource>) -> Self {
        Self { source }
    }

    /// Reactions across up to `limit` reports, de-duplicated in first-seen order.
    pub async fn lookup(&self, drug: &str, limit: usize) -> Result<SideEffects> {
        let name = sanitize_term(drug);
        let search = format!("patient.drug.medicinalproduct:\"{}\"", name);
        let reports = self
            .source
            .query(StructuredEndpoint::Event, &search, limit)
            .await?;

        let reactions = collect_reactions(&reports);
        debug!(drug = %name, reports = reports.len(), reactions = reactions.len(), "Collected reactions");

        Ok(SideEffects {
            drug: name,
            reactions,
        })
    }
}

fn collect_reactions(reports: &[Value]) -> Vec<String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    for report in reports {
        let Some(reactions) = report
            .pointer("/patient/reaction")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for reaction in reactions {
            if let Some(term) = reaction.get("reactionmeddrapt").and_then(Value::as_str) {
                seen.insert(term.to_string());
            }
        }
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStructuredSource;
    use serde_json::json;

    #[tokio::test]
    async fn test_collects_distinct_reactions_in_order() {
        let reports = vec![
            json!({ "patient": { "reaction": [
                { "reactionmeddrapt": "Nausea" },
                { "reactionmeddrapt": "Headache" }
            ]}}),
            json!({ "patient": {} }),
            json!({ "patient": { "reaction": [
                { "reactionmeddrapt": "Nausea" },
                { "reactionoutcome": "1" },
                { "reactionmeddrapt": "Rash" }
            ]}}),
        ];
        let source = Arc::new(MockStructuredSource::new().with_results(
            "patient.drug.medicinalproduct:\"Ibuprofen\"",
            reports,
        ));

        let effects = SideEffectLookup::new(source)
            .lookup("Ibuprofen", 10)
            .await
            .unwrap();
        assert_eq!(effects.drug, "Ibuprofen");
        assert_eq!(effects.reactions, vec!["Nausea", "Headache", "Rash"]);
    }

    #[tokio::test]
    async fn test_no_reports_is_empty() {
        let effects = SideEffectLookup::new(Arc::new(MockStructuredSource::new()))
            .lookup("nothing", 10)
            .await
            .unwrap();
        assert!(effects.is_empty());
    }
}
