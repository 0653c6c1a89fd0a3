//! Interaction report parser.
//!
//! Walks the report in four steps, each of which may end the parse with a
//! descriptive result instead of an error:
//!
//! ```text
//! SeekHeader ──none──▶ NoSection
//!     │
//! SeekWrapper ──none──▶ NoWrapper
//!     │
//! EnumerateInstances ──zero──▶ NoInstances
//!     │
//! ExtractRecord (per instance) ──▶ Interactions([...])
//! ```
//!
//! Expected shape of the section:
//!
//! ```html
//! <h2>Drug and food interactions</h2>
//! <div class="interactions-reference-wrapper">
//!   <div class="interactions-reference">
//!     <div class="interactions-reference-header">
//!       <h3>ibuprofen food</h3>
//!       <p>Applies to: ibuprofen</p>
//!     </div>
//!     <p>Description...</p>
//!     <p>Switch to professional interaction data</p>
//!   </div>
//! </div>
//! ```

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::extract::visible_text;
use crate::types::interaction::{InteractionRecord, InteractionReport};

/// Section heading phrase, matched case-insensitively.
pub const SECTION_PHRASE: &str = "drug and food interactions";

/// Paragraphs containing this phrase are page chrome, not description.
pub const BOILERPLATE_PHRASE: &str = "Switch to professional";

const APPLIES_TO_PREFIX: &str = "applies to:";

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static INSTANCES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".interactions-reference").unwrap());
static INSTANCE_HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".interactions-reference-header").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// English ordinal: 1st, 2nd, 3rd, 4th … 11th, 12th, 13th … 21st … 112th.
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Parse an interactions report. Never fails.
pub fn parse_interactions(html: &str) -> InteractionReport {
    let document = Html::parse_document(html);

    // SeekHeader
    let Some(header) = document
        .select(&HEADINGS)
        .find(|h| visible_text(*h).to_lowercase().contains(SECTION_PHRASE))
    else {
        debug!("No interactions section header");
        return InteractionReport::NoSection;
    };

    // SeekWrapper
    let Some(wrapper) = find_wrapper(header) else {
        debug!("Interactions header has no wrapper");
        return InteractionReport::NoWrapper;
    };

    // EnumerateInstances
    let mut instances: Vec<ElementRef<'_>> = wrapper.select(&INSTANCES).collect();
    if instances.is_empty() {
        instances = wrapper
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "div")
            .collect();
    }
    if instances.is_empty() {
        debug!("Interactions wrapper has no instances");
        return InteractionReport::NoInstances;
    }

    // ExtractRecord
    let records: Vec<InteractionRecord> = instances
        .into_iter()
        .filter_map(extract_record)
        .enumerate()
        .map(|(i, mut record)| {
            record.ordinal_label = format!("{} interaction", ordinal(i + 1));
            record
        })
        .collect();

    debug!(count = records.len(), "Parsed interaction records");
    InteractionReport::Interactions(records)
}

/// First `div` among the header's following siblings, before the next heading.
fn find_wrapper(header: ElementRef<'_>) -> Option<ElementRef<'_>> {
    (*header)
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !is_heading(*el))
        .find(|el| el.value().name() == "div")
}

fn is_heading(el: ElementRef<'_>) -> bool {
    HEADING_TAGS.contains(&el.value().name())
}

/// Header sub-block of an instance: the dedicated header element, or
/// failing that the block around the first heading.
fn header_block<'a>(instance: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if let Some(header) = instance.select(&INSTANCE_HEADER).next() {
        return Some(header);
    }

    let heading = instance.select(&HEADINGS).next()?;
    match heading.parent().and_then(ElementRef::wrap) {
        Some(parent) if parent.id() != instance.id() => Some(parent),
        _ => Some(heading),
    }
}

fn extract_record(instance: ElementRef<'_>) -> Option<InteractionRecord> {
    let header = header_block(instance)?;

    // Identity-based exclusion: a description paragraph with the same text
    // as the applies-to line must still be kept.
    let body: Vec<ElementRef<'_>> = instance
        .select(&PARAGRAPHS)
        .filter(|p| !(**p).ancestors().any(|a| a.id() == header.id()) && p.id() != header.id())
        .collect();

    if body.is_empty() {
        return None;
    }

    let title_heading = if is_heading(header) {
        Some(header)
    } else {
        header.select(&HEADINGS).next()
    };
    let title = title_heading
        .map(visible_text)
        .filter(|t| !t.is_empty());

    let applies_to = header
        .select(&PARAGRAPHS)
        .next()
        .map(visible_text)
        .map(|t| strip_applies_to(&t))
        .filter(|t| !t.is_empty());

    let description: Vec<String> = body
        .into_iter()
        .map(visible_text)
        .filter(|t| !t.is_empty() && !t.contains(BOILERPLATE_PHRASE))
        .collect();

    Some(InteractionRecord {
        ordinal_label: String::new(),
        title,
        applies_to,
        description: if description.is_empty() {
            None
        } else {
            Some(description.join("\n\n"))
        },
    })
}

fn strip_applies_to(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.get(..APPLIES_TO_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(APPLIES_TO_PREFIX) => {
            trimmed[APPLIES_TO_PREFIX.len()..].trim().to_string()
        }
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"
        <html><body>
          <h2>Interactions between your drugs</h2>
          <p>No interactions were found between ibuprofen and acetaminophen.</p>
          <h2>Drug and Food Interactions</h2>
          <p class="note">Moderate</p>
          <div class="interactions-reference-wrapper">
            <div class="interactions-reference">
              <div class="interactions-reference-header">
                <h3>ibuprofen food</h3>
                <p>Applies to: ibuprofen</p>
              </div>
              <p>Ibuprofen can cause gastrointestinal irritation.</p>
              <p>Take it with food.</p>
              <p>Switch to professional interaction data</p>
            </div>
            <div class="interactions-reference">
              <div class="interactions-reference-header">
                <p>Applies to: acetaminophen</p>
              </div>
              <p>Switch to professional interaction data</p>
            </div>
            <div class="interactions-reference">
              <div class="interactions-reference-header">
                <h3>header only</h3>
              </div>
            </div>
            <div class="interactions-reference">
              <div class="interactions-reference-header">
                <h3>alcohol acetaminophen</h3>
                <p>Applies to: acetaminophen</p>
              </div>
              <p>Applies to: acetaminophen</p>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_ordinals() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (20, "20th"),
            (21, "21st"),
            (22, "22nd"),
            (101, "101st"),
            (111, "111th"),
            (112, "112th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected, "ordinal({})", n);
        }
    }

    #[test]
    fn test_parses_records() {
        let report = parse_interactions(REPORT);
        let records = report.records();

        assert_eq!(records.len(), 3);

        assert_eq!(records[0].ordinal_label, "1st interaction");
        assert_eq!(records[0].title.as_deref(), Some("ibuprofen food"));
        assert_eq!(records[0].applies_to.as_deref(), Some("ibuprofen"));
        assert_eq!(
            records[0].description.as_deref(),
            Some("Ibuprofen can cause gastrointestinal irritation.\n\nTake it with food.")
        );

        // Partial record: no title, only boilerplate in the body
        assert_eq!(records[1].ordinal_label, "2nd interaction");
        assert!(records[1].title.is_none());
        assert_eq!(records[1].applies_to.as_deref(), Some("acetaminophen"));
        assert!(records[1].description.is_none());

        // Body paragraph identical to the header line is still kept
        assert_eq!(records[2].ordinal_label, "3rd interaction");
        assert_eq!(
            records[2].description.as_deref(),
            Some("Applies to: acetaminophen")
        );
    }

    #[test]
    fn test_no_section() {
        let report = parse_interactions("<html><body><h2>Overview</h2></body></html>");
        assert_eq!(report, InteractionReport::NoSection);
        assert!(report.message().is_some());
        assert_eq!(parse_interactions(""), InteractionReport::NoSection);
    }

    #[test]
    fn test_no_wrapper() {
        let html = "<h2>Drug and food interactions</h2><p>None.</p><h2>Next</h2><div></div>";
        assert_eq!(parse_interactions(html), InteractionReport::NoWrapper);
    }

    #[test]
    fn test_no_instances() {
        let html = "<h2>Drug and food interactions</h2><div><p>Nothing here</p></div>";
        assert_eq!(parse_interactions(html), InteractionReport::NoInstances);
    }

    #[test]
    fn test_unclassed_instances_fall_back_to_child_divs() {
        let html = r#"
            <h3>drug and food interactions</h3>
            <div>
              <div><h4>caffeine food</h4><p>Limit coffee.</p></div>
            </div>
        "#;
        let report = parse_interactions(html);
        let records = report.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("caffeine food"));
        assert_eq!(records[0].description.as_deref(), Some("Limit coffee."));
        assert!(records[0].applies_to.is_none());
    }

    #[test]
    fn test_strip_applies_to() {
        assert_eq!(strip_applies_to("Applies to: ibuprofen"), "ibuprofen");
        assert_eq!(strip_applies_to("APPLIES TO:x"), "x");
        assert_eq!(strip_applies_to("ibuprofen"), "ibuprofen");
    }
}
