//! Candidate extraction from the imprint search results page.
//!
//! The only durable anchor on the page is the literal link text
//! "View details". Each such link sits inside the entry's container, so we
//! walk up to the nearest container element and read its text.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::traits::locator::CandidateLocator;
use crate::types::candidate::CandidateMatch;

/// Default anchor text of a result entry's detail link.
pub const DEFAULT_ANCHOR_TEXT: &str = "View details";

/// Default container element wrapping one result entry.
pub const DEFAULT_CONTAINER_TAG: &str = "div";

/// Locates candidates by their "View details" link.
#[derive(Debug, Clone)]
pub struct ViewDetailsLocator {
    anchor_text: String,
    container_tag: String,
}

impl Default for ViewDetailsLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewDetailsLocator {
    pub fn new() -> Self {
        Self {
            anchor_text: DEFAULT_ANCHOR_TEXT.to_string(),
            container_tag: DEFAULT_CONTAINER_TAG.to_string(),
        }
    }

    /// Match a different link text.
    pub fn with_anchor_text(mut self, text: impl Into<String>) -> Self {
        self.anchor_text = text.into();
        self
    }

    /// Walk up to a different container element.
    pub fn with_container_tag(mut self, tag: impl Into<String>) -> Self {
        self.container_tag = tag.into().to_lowercase();
        self
    }

    fn nearest_container<'a>(&self, anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
        (*anchor)
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == self.container_tag)
    }
}

impl CandidateLocator for ViewDetailsLocator {
    fn locate(&self, html: &str) -> Vec<CandidateMatch> {
        let document = Html::parse_document(html);
        let link_selector = match Selector::parse("a") {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        let candidates: Vec<CandidateMatch> = document
            .select(&link_selector)
            .filter(|a| collapse_whitespace(&a.text().collect::<String>()) == self.anchor_text)
            .filter_map(|a| self.nearest_container(a))
            .map(|container| CandidateMatch::new(visible_text(container)))
            .collect();

        debug!(count = candidates.len(), "Located candidate entries");
        candidates
    }
}

/// Text of an element: each text node whitespace-collapsed, empty ones
/// dropped, joined by single spaces.
pub fn visible_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
          <div class="ddc-card">
            <div class="ddc-card-content">
              <h3>Ibuprofen</h3>
              <dl><dt>Strength</dt><dd>200 mg</dd>
                  <dt>Imprint</dt><dd>I-2</dd></dl>
              <a href="/imprints/i-2-1.html">View details</a>
            </div>
          </div>
          <div class="ddc-card">
            <div class="ddc-card-content">
              <h3>Advil</h3>
              <p>Strength <b>200   mg</b></p>
              <a href="/imprints/advil.html">
                 View   details
              </a>
            </div>
          </div>
          <a href="/other">View details</a>
        </body></html>
    "#;

    #[test]
    fn test_locates_in_document_order() {
        let candidates = ViewDetailsLocator::new().locate(RESULTS_PAGE);

        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].text(),
            "Ibuprofen Strength 200 mg Imprint I-2 View details"
        );
        assert_eq!(candidates[1].text(), "Advil Strength 200 mg View details");
    }

    #[test]
    fn test_zero_matches_is_empty() {
        let html = "<html><body><div><a href='/x'>Details</a></div></body></html>";
        assert!(ViewDetailsLocator::new().locate(html).is_empty());
        assert!(ViewDetailsLocator::new().locate("").is_empty());
    }

    #[test]
    fn test_custom_container() {
        let html = r#"<ul><li>Aspirin 81 mg <a href="/a">More</a></li></ul>"#;
        let locator = ViewDetailsLocator::new()
            .with_anchor_text("More")
            .with_container_tag("LI");
        let candidates = locator.locate(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text(), "Aspirin 81 mg More");
    }
}
