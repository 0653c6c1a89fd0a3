//! Labeling section fetcher.
//!
//! Queries the labeling endpoint by brand name, falls back to the generic
//! name when nothing matches, and routes table-bearing fields through the
//! table extractor.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::table::{contains_table, extract_table};
use crate::error::Result;
use crate::traits::source::{StructuredEndpoint, StructuredSource};
use crate::types::labeling::{LabelingEntry, LabelingSection, SectionKey};

/// Fetches labeling sections for a drug name.
#[derive(Clone)]
pub struct LabelingFetcher {
    source: Arc<dyn StructuredSource>,
}

impl LabelingFetcher {
    pub fn new(source: Arc<dyn StructuredSource>) -> Self {
        Self { source }
    }

    /// One section across up to `limit` labeling results.
    pub async fn fetch_section(
        &self,
        drug: &str,
        section: SectionKey,
        limit: usize,
    ) -> Result<LabelingSection> {
        let results = self.query_with_fallback(drug, limit).await?;
        Ok(project_section(&results, section))
    }

    /// Every section, in [`SectionKey::ALL`] order, from a single query.
    pub async fn fetch_all_sections(
        &self,
        drug: &str,
        limit: usize,
    ) -> Result<IndexMap<SectionKey, LabelingSection>> {
        let results = self.query_with_fallback(drug, limit).await?;
        Ok(SectionKey::ALL
            .into_iter()
            .map(|key| (key, project_section(&results, key)))
            .collect())
    }

    async fn query_with_fallback(&self, drug: &str, limit: usize) -> Result<Vec<Value>> {
        let name = sanitize_term(drug);

        let by_brand = format!("openfda.brand_name:\"{}\"", name);
        let results = self
            .source
            .query(StructuredEndpoint::Label, &by_brand, limit)
            .await?;
        if !results.is_empty() {
            debug!(drug = %name, count = results.len(), "Labeling matched by brand name");
            return Ok(results);
        }

        info!(drug = %name, "No labeling by brand name, trying generic name");
        let by_generic = format!("openfda.generic_name:\"{}\"", name);
        self.source
            .query(StructuredEndpoint::Label, &by_generic, limit)
            .await
    }
}

/// Quotes would break the search expression.
pub(crate) fn sanitize_term(term: &str) -> String {
    term.replace('"', "").trim().to_string()
}

fn project_section(results: &[Value], section: SectionKey) -> LabelingSection {
    LabelingSection {
        section,
        entries: results
            .iter()
            .map(|result| entry_for(result.get(section.field())))
            .collect(),
    }
}

fn entry_for(field: Option<&Value>) -> LabelingEntry {
    let text = match field {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(values)) => values.first().and_then(Value::as_str),
        _ => None,
    };

    match text {
        None => LabelingEntry::Absent,
        Some(t) if contains_table(t) => LabelingEntry::Table(extract_table(t)),
        Some(t) => LabelingEntry::Text(t.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStructuredSource;
    use crate::types::labeling::CellValue;
    use serde_json::json;

    fn advil_label() -> Value {
        json!({
            "openfda": { "brand_name": ["Advil"], "generic_name": ["IBUPROFEN"] },
            "purpose": ["Pain reliever/fever reducer"],
            "dosage_and_administration_table": [
                "<table><tr><th>Age</th><th>Dose</th></tr><tr><td>adults</td><td>1 tablet</td></tr></table>"
            ],
            "stop_use": []
        })
    }

    #[tokio::test]
    async fn test_brand_name_match() {
        let source = Arc::new(
            MockStructuredSource::new()
                .with_results("openfda.brand_name:\"Advil\"", vec![advil_label()]),
        );
        let fetcher = LabelingFetcher::new(source.clone());

        let section = fetcher
            .fetch_section("Advil", SectionKey::Purpose, 1)
            .await
            .unwrap();
        assert_eq!(
            section.entries,
            vec![LabelingEntry::Text("Pain reliever/fever reducer".into())]
        );
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_generic_name() {
        let source = Arc::new(
            MockStructuredSource::new()
                .with_results("openfda.generic_name:\"ibuprofen\"", vec![advil_label()]),
        );
        let fetcher = LabelingFetcher::new(source.clone());

        let section = fetcher
            .fetch_section("ibuprofen", SectionKey::DosageTable, 1)
            .await
            .unwrap();

        let LabelingEntry::Table(rows) = &section.entries[0] else {
            panic!("expected a table, got {:?}", section.entries[0]);
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["col2"], CellValue::Text("1 tablet".into()));

        let queries = source.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("brand_name"));
        assert!(queries[1].contains("generic_name"));
    }

    #[tokio::test]
    async fn test_all_sections_from_one_result_set() {
        let source = Arc::new(
            MockStructuredSource::new()
                .with_results("openfda.brand_name:\"Advil\"", vec![advil_label()]),
        );
        let fetcher = LabelingFetcher::new(source.clone());

        let all = fetcher.fetch_all_sections("Advil", 1).await.unwrap();
        assert_eq!(all.len(), SectionKey::ALL.len());
        assert_eq!(all.keys().next(), Some(&SectionKey::AskDoctor));
        assert!(all[&SectionKey::AskDoctor].entries[0].is_absent());
        assert!(all[&SectionKey::StopUse].entries[0].is_absent());
        assert_eq!(source.query_count(), 1);
    }

    #[tokio::test]
    async fn test_no_results_anywhere_is_empty_section() {
        let fetcher = LabelingFetcher::new(Arc::new(MockStructuredSource::new()));
        let section = fetcher
            .fetch_section("unknownium", SectionKey::Purpose, 3)
            .await
            .unwrap();
        assert!(section.entries.is_empty());
    }
}
