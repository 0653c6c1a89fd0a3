//! Structured drug data source (labeling and adverse events).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Endpoints of the structured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredEndpoint {
    /// Product labeling documents
    Label,
    /// Adverse event reports
    Event,
}

impl StructuredEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            StructuredEndpoint::Label => "drug/label.json",
            StructuredEndpoint::Event => "drug/event.json",
        }
    }
}

/// Queryable JSON source.
///
/// A non-200 answer or a missing `results` list is "no data" and yields an
/// empty vec. Only transport failures are errors.
#[async_trait]
pub trait StructuredSource: Send + Sync {
    async fn query(
        &self,
        endpoint: StructuredEndpoint,
        search: &str,
        limit: usize,
    ) -> Result<Vec<Value>>;
}
