//! Feature normalizer: vision model text → [`FeatureQuery`].
//!
//! Two layouts are accepted:
//!
//! ```text
//! Imprint: TEVA 123        TEVA 123
//! Color: white             white
//! Shape: round             round
//! ```
//!
//! The labeled form is preferred because it does not depend on line order.
//! As soon as one line carries a label, all three labels are required.
//! Unlabeled text falls back to position: imprint, color, shape.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{PillIdError, Result};
use crate::types::query::FeatureQuery;

/// Minimum number of non-empty lines in a usable answer.
pub const MIN_FEATURE_LINES: usize = 3;

static RE_LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s*\-•]*\**(imprint|colou?r|shape)\**\s*[:\-]\s*(.*)$").unwrap()
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Imprint,
    Color,
    Shape,
}

/// Parse the model's answer into a normalized query.
pub fn normalize_features(raw: &str) -> Result<FeatureQuery> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < MIN_FEATURE_LINES {
        return Err(PillIdError::malformed(format!(
            "expected at least {} non-empty lines, found {}",
            MIN_FEATURE_LINES,
            lines.len()
        )));
    }

    let labeled: Vec<(Field, &str)> = lines.iter().filter_map(|l| labeled_line(l)).collect();

    let query = if labeled.is_empty() {
        debug!(lines = lines.len(), "Parsing positional feature text");
        FeatureQuery::new(lines[0], lines[1], lines[2])?
    } else {
        debug!(labeled = labeled.len(), "Parsing labeled feature text");
        let find = |field: Field, name: &str| {
            labeled
                .iter()
                .find(|(f, value)| *f == field && !value.is_empty())
                .map(|(_, value)| *value)
                .ok_or_else(|| PillIdError::malformed(format!("missing '{}' line", name)))
        };
        FeatureQuery::new(
            find(Field::Imprint, "imprint")?,
            find(Field::Color, "color")?,
            find(Field::Shape, "shape")?,
        )?
    };

    Ok(query)
}

fn labeled_line(line: &str) -> Option<(Field, &str)> {
    let caps = RE_LABELED.captures(line)?;
    let label = caps.get(1)?.as_str().to_lowercase();
    let value = caps.get(2)?.as_str().trim().trim_matches('*').trim();
    let field = match label.as_str() {
        "imprint" => Field::Imprint,
        "shape" => Field::Shape,
        _ => Field::Color,
    };
    Some((field, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_positional_example() {
        let query = normalize_features("TEVA 123\nwhite\nround").unwrap();
        assert_eq!(query.imprint(), "TEVA+123");
        assert_eq!(query.color(), "white");
        assert_eq!(query.shape(), "round");
    }

    #[test]
    fn test_tolerates_extra_lines_and_whitespace() {
        let raw = "\n  IP 465  \r\n\n  WHITE \nOval\nThis pill looks like ibuprofen.\n";
        let query = normalize_features(raw).unwrap();
        assert_eq!(query.imprint(), "IP+465");
        assert_eq!(query.color(), "white");
        assert_eq!(query.shape(), "oval");
    }

    #[test]
    fn test_labeled_any_order() {
        let raw = "Shape: Round\n- **Color:** Pink\nImprint: M 30";
        let query = normalize_features(raw).unwrap();
        assert_eq!(query.imprint(), "M+30");
        assert_eq!(query.color(), "pink");
        assert_eq!(query.shape(), "round");
    }

    #[test]
    fn test_labeled_requires_all_fields() {
        let raw = "Imprint: M 30\nColor: pink\nround";
        let err = normalize_features(raw).unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn test_too_few_lines() {
        let err = normalize_features("TEVA 123\n\nwhite\n").unwrap_err();
        assert!(matches!(err, PillIdError::MalformedFeatureText { .. }));
    }

    proptest! {
        #[test]
        fn prop_imprint_has_no_spaces_and_tokens_are_lowercase(
            imprint in "[A-Za-z0-9]{1,6}( [A-Za-z0-9]{1,6}){0,3}",
            color in "[A-Za-z]{1,8}( [A-Za-z]{1,8})?",
            shape in "[A-Za-z]{1,8}",
        ) {
            let raw = format!("{}\n{}\n{}", imprint, color, shape);
            let query = normalize_features(&raw).unwrap();
            prop_assert!(!query.imprint().contains(' '));
            prop_assert_eq!(query.color(), query.color().to_lowercase());
            prop_assert_eq!(query.shape(), query.shape().to_lowercase());
        }
    }
}
