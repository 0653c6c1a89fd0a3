//! `PillIdentifier`: the pipeline facade.
//!
//! Wires the normalizer, locator, ranker, resolver, interaction parser and
//! labeling lookups together over injected collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use pill_id::{PillIdentifier, PillIdConfig};
//!
//! let identifier = PillIdentifier::builder()
//!     .fetcher(Arc::new(fetcher))
//!     .browser(Arc::new(WebDriverLauncher::new("http://localhost:4444", &config.http)?))
//!     .source(Arc::new(OpenFdaClient::new(&config.structured_base_url, &config.http)?))
//!     .vision(Arc::new(OpenAIVision::from_env()?))
//!     .config(config)
//!     .build()?;
//!
//! let ranked = identifier.identify_image(&bytes, "image/jpeg").await?;
//! ```

use indexmap::IndexMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::count::{count_instruction, parse_count};
use super::events::SideEffectLookup;
use super::extract::ViewDetailsLocator;
use super::interactions::parse_interactions;
use super::labeling::LabelingFetcher;
use super::normalize::normalize_features;
use super::rank::rank;
use super::resolve::IdentifierResolver;
use crate::error::{PillIdError, Result};
use crate::traits::{
    browser::BrowserLauncher, fetcher::DocumentFetcher, locator::CandidateLocator,
    source::StructuredSource, vision::VisionModel,
};
use crate::types::{
    candidate::{Choice, RankedResult},
    config::PillIdConfig,
    events::{ChoiceSideEffects, IdentifiedPill, SideEffects},
    interaction::{DrugIdentifier, InteractionReport},
    labeling::{LabelingSection, SectionKey},
    query::{FeatureQuery, IMPRINT_JOIN},
};

/// The pill identification pipeline.
#[derive(Clone)]
pub struct PillIdentifier {
    fetcher: Arc<dyn DocumentFetcher>,
    locator: Arc<dyn CandidateLocator>,
    vision: Option<Arc<dyn VisionModel>>,
    resolver: IdentifierResolver,
    labeling: LabelingFetcher,
    events: SideEffectLookup,
    config: PillIdConfig,
}

impl PillIdentifier {
    pub fn builder() -> PillIdentifierBuilder {
        PillIdentifierBuilder::default()
    }

    pub fn config(&self) -> &PillIdConfig {
        &self.config
    }

    // =========================================================================
    // Pill match
    // =========================================================================

    /// Photo → vision answer → ranked candidates.
    pub async fn identify_image(&self, image: &[u8], mime_type: &str) -> Result<RankedResult> {
        let vision = self.vision()?;
        let answer = vision
            .describe(image, mime_type, &self.config.vision_instruction)
            .await?;
        debug!(model = vision.name(), answer = %answer, "Vision described pill");
        self.identify_text(&answer).await
    }

    /// Feature text → ranked candidates.
    ///
    /// An unavailable match source yields the all-sentinel result so that
    /// callers always get the fixed-key shape. Use [`Self::search`] to see
    /// the failure instead.
    pub async fn identify_text(&self, raw: &str) -> Result<RankedResult> {
        let query = normalize_features(raw)?;
        match self.search(&query).await {
            Err(PillIdError::SourceUnavailable { url, status }) => {
                warn!(url = %url, status, "Match source unavailable, returning empty result");
                Ok(RankedResult::empty(query))
            }
            other => other,
        }
    }

    /// [`Self::identify_image`], then the reported reactions of each match.
    pub async fn identify_image_with_side_effects(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<IdentifiedPill> {
        let result = self.identify_image(image, mime_type).await?;
        Ok(self.with_side_effects(result).await)
    }

    /// Look up reactions for every matched choice by its drug name.
    ///
    /// Lookups run concurrently. A failed lookup marks only its own slot as
    /// unavailable; sentinel slots are skipped.
    pub async fn with_side_effects(&self, result: RankedResult) -> IdentifiedPill {
        let [first, second, third] = &result.choices;
        let (first, second, third) = tokio::join!(
            self.choice_side_effects(first),
            self.choice_side_effects(second),
            self.choice_side_effects(third),
        );

        IdentifiedPill {
            result,
            side_effects: [first, second, third],
        }
    }

    async fn choice_side_effects(&self, choice: &Choice) -> ChoiceSideEffects {
        let Some(drug) = choice.as_match().and_then(|m| m.drug_name()) else {
            return ChoiceSideEffects::NotLooked;
        };

        match self.events.lookup(drug, self.config.event_limit).await {
            Ok(effects) => ChoiceSideEffects::Found(effects),
            Err(e) => {
                warn!(drug = %drug, error = %e, "Side-effect lookup failed for choice");
                ChoiceSideEffects::Unavailable
            }
        }
    }

    /// Query the match source. Any status but 200 is `SourceUnavailable`.
    pub async fn search(&self, query: &FeatureQuery) -> Result<RankedResult> {
        let url = self.search_url(query);
        let html = self.fetcher.fetch(&url).await?.require_ok()?;
        let candidates = self.locator.locate(&html);
        let result = rank(query.clone(), candidates);

        info!(
            imprint = %query.imprint(),
            color = %query.color(),
            shape = %query.shape(),
            matches = result.available(),
            "Pill search finished"
        );
        Ok(result)
    }

    /// Match URL for a query. Imprint segments are encoded one by one and
    /// joined with `+`.
    pub fn search_url(&self, query: &FeatureQuery) -> String {
        let imprint = query
            .imprint()
            .split(IMPRINT_JOIN)
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join(&IMPRINT_JOIN.to_string());

        self.config
            .imprint_search_url
            .replace("{imprint}", &imprint)
            .replace("{color}", &urlencoding::encode(query.color()))
            .replace("{shape}", &urlencoding::encode(query.shape()))
    }

    /// Ask the vision model how many pills matching `query` are in the photo.
    pub async fn count_pills(
        &self,
        image: &[u8],
        mime_type: &str,
        query: &FeatureQuery,
    ) -> Result<u32> {
        let answer = self
            .vision()?
            .describe(image, mime_type, &count_instruction(query))
            .await?;
        let count = parse_count(&answer)?;
        info!(imprint = %query.imprint(), count, "Counted pills");
        Ok(count)
    }

    fn vision(&self) -> Result<&Arc<dyn VisionModel>> {
        self.vision
            .as_ref()
            .ok_or_else(|| PillIdError::Config("no vision model configured".into()))
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Resolve both drugs concurrently, then fetch and parse their report.
    ///
    /// Cancelling `cancel` aborts pending resolution attempts (closing their
    /// sessions) and the report fetch. If one resolution fails the other is
    /// cancelled and the first real failure is returned.
    pub async fn check_interactions(
        &self,
        drug_a: &str,
        drug_b: &str,
        cancel: &CancellationToken,
    ) -> Result<InteractionReport> {
        let pair = cancel.child_token();
        let (id_a, id_b) = match tokio::join!(
            self.resolve_in_pair(drug_a, &pair),
            self.resolve_in_pair(drug_b, &pair),
        ) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
            (Err(PillIdError::Cancelled), Err(e)) | (Err(e), Err(_)) => return Err(e),
        };

        let url = self.report_url(&id_a, &id_b);
        debug!(drug_a = %drug_a, drug_b = %drug_b, url = %url, "Fetching interactions report");

        let doc = tokio::select! {
            result = self.fetcher.fetch(&url) => result?,
            _ = cancel.cancelled() => return Err(PillIdError::Cancelled),
        };

        let report = parse_interactions(&doc.require_ok()?);
        info!(
            drug_a = %drug_a,
            drug_b = %drug_b,
            interactions = report.records().len(),
            "Interactions report parsed"
        );
        Ok(report)
    }

    async fn resolve_in_pair(&self, drug: &str, pair: &CancellationToken) -> Result<DrugIdentifier> {
        let result = self.resolver.resolve(drug, pair).await;
        if result.is_err() {
            pair.cancel();
        }
        result
    }

    /// Report URL for a pair of identifiers.
    pub fn report_url(&self, a: &DrugIdentifier, b: &DrugIdentifier) -> String {
        self.config
            .interaction_report_url
            .replace("{drug_list}", &format!("{},{}", a, b))
    }

    /// Identifier for a single drug name.
    pub async fn resolve_identifier(
        &self,
        drug: &str,
        cancel: &CancellationToken,
    ) -> Result<DrugIdentifier> {
        self.resolver.resolve(drug, cancel).await
    }

    // =========================================================================
    // Labeling and events
    // =========================================================================

    /// One labeling section. `limit` defaults to the configured label limit.
    pub async fn label_section(
        &self,
        drug: &str,
        section: SectionKey,
        limit: Option<usize>,
    ) -> Result<LabelingSection> {
        self.labeling
            .fetch_section(drug, section, limit.unwrap_or(self.config.label_limit))
            .await
    }

    /// Every labeling section from one query.
    pub async fn label_all_sections(
        &self,
        drug: &str,
        limit: Option<usize>,
    ) -> Result<IndexMap<SectionKey, LabelingSection>> {
        self.labeling
            .fetch_all_sections(drug, limit.unwrap_or(self.config.label_limit))
            .await
    }

    /// Reported reactions. `limit` defaults to the configured event limit.
    pub async fn side_effects(&self, drug: &str, limit: Option<usize>) -> Result<SideEffects> {
        self.events
            .lookup(drug, limit.unwrap_or(self.config.event_limit))
            .await
    }
}

/// Builder for [`PillIdentifier`].
///
/// `fetcher`, `browser` and `source` are required. The locator defaults to
/// [`ViewDetailsLocator`]; without a vision model the image operations fail
/// with a `Config` error.
#[derive(Default)]
pub struct PillIdentifierBuilder {
    fetcher: Option<Arc<dyn DocumentFetcher>>,
    locator: Option<Arc<dyn CandidateLocator>>,
    browser: Option<Arc<dyn BrowserLauncher>>,
    source: Option<Arc<dyn StructuredSource>>,
    vision: Option<Arc<dyn VisionModel>>,
    config: PillIdConfig,
}

impl PillIdentifierBuilder {
    pub fn fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn locator(mut self, locator: Arc<dyn CandidateLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn source(mut self, source: Arc<dyn StructuredSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionModel>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn config(mut self, config: PillIdConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PillIdentifier> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| PillIdError::Config("document fetcher is required".into()))?;
        let browser = self
            .browser
            .ok_or_else(|| PillIdError::Config("browser launcher is required".into()))?;
        let source = self
            .source
            .ok_or_else(|| PillIdError::Config("structured source is required".into()))?;

        for (name, template, placeholder) in [
            ("imprint_search_url", &self.config.imprint_search_url, "{imprint}"),
            ("interaction_search_url", &self.config.interaction_search_url, "{drug}"),
            ("interaction_report_url", &self.config.interaction_report_url, "{drug_list}"),
        ] {
            if !template.contains(placeholder) {
                return Err(PillIdError::Config(format!(
                    "{} must contain {}",
                    name, placeholder
                )));
            }
        }

        let resolver = IdentifierResolver::new(
            browser,
            self.config.interaction_search_url.clone(),
            self.config.resolver.clone(),
        );

        Ok(PillIdentifier {
            fetcher,
            locator: self
                .locator
                .unwrap_or_else(|| Arc::new(ViewDetailsLocator::new())),
            vision: self.vision,
            resolver,
            labeling: LabelingFetcher::new(Arc::clone(&source)),
            events: SideEffectLookup::new(source),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, MockFetcher, MockStructuredSource};

    fn identifier(fetcher: MockFetcher) -> PillIdentifier {
        PillIdentifier::builder()
            .fetcher(Arc::new(fetcher))
            .browser(Arc::new(MockBrowser::never_redirects()))
            .source(Arc::new(MockStructuredSource::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_search_url_keeps_imprint_join() {
        let id = identifier(MockFetcher::new());
        let query = FeatureQuery::new("TEVA 123", "light blue", "round").unwrap();
        assert_eq!(
            id.search_url(&query),
            "https://www.drugs.com/imprints.php?imprint=TEVA+123&color=light%20blue&shape=round"
        );

        let query = FeatureQuery::new("A&B 5/10", "white", "oval").unwrap();
        assert_eq!(
            id.search_url(&query),
            "https://www.drugs.com/imprints.php?imprint=A%26B+5%2F10&color=white&shape=oval"
        );
    }

    #[test]
    fn test_report_url() {
        let id = identifier(MockFetcher::new());
        let a = DrugIdentifier::new("1233-0").unwrap();
        let b = DrugIdentifier::new("243-0").unwrap();
        assert_eq!(
            id.report_url(&a, &b),
            "https://www.drugs.com/interactions-check.php?drug_list=1233-0,243-0"
        );
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let err = PillIdentifier::builder().build().err().unwrap();
        assert!(matches!(err, PillIdError::Config(_)));

        let err = PillIdentifier::builder()
            .fetcher(Arc::new(MockFetcher::new()))
            .browser(Arc::new(MockBrowser::never_redirects()))
            .source(Arc::new(MockStructuredSource::new()))
            .config(PillIdConfig::new().with_imprint_search_url("https://x/?q=fixed"))
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("{imprint}"));
    }

    #[tokio::test]
    async fn test_image_operations_need_vision() {
        let id = identifier(MockFetcher::new());
        let err = id.identify_image(b"img", "image/png").await.unwrap_err();
        assert!(matches!(err, PillIdError::Config(_)));
    }

    #[tokio::test]
    async fn test_search_is_strict_but_identify_text_is_not() {
        let fetcher = MockFetcher::new();
        let id = identifier(fetcher.clone());
        let query = FeatureQuery::new("I-2", "orange", "round").unwrap();

        let err = id.search(&query).await.unwrap_err();
        assert!(matches!(err, PillIdError::SourceUnavailable { status: 404, .. }));

        let result = id.identify_text("I-2\norange\nround").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(fetcher.fetched_urls().len(), 2);
    }
}
