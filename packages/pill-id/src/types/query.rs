//! Normalized pill feature query.

use serde::{Deserialize, Serialize};

use crate::error::{PillIdError, Result};

/// Join character used in place of spaces inside an imprint.
///
/// The imprint search endpoint expects multi-part imprints as `TEVA+123`.
pub const IMPRINT_JOIN: char = '+';

/// Imprint, color and shape of a pill, normalized for the match query.
///
/// - `imprint` keeps its case; whitespace runs become a single `+`
/// - `color` and `shape` are lowercased and whitespace-collapsed
///
/// All three fields are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureQuery {
    imprint: String,
    color: String,
    shape: String,
}

impl FeatureQuery {
    /// Normalize and validate raw feature values.
    pub fn new(
        imprint: impl AsRef<str>,
        color: impl AsRef<str>,
        shape: impl AsRef<str>,
    ) -> Result<Self> {
        let imprint = normalize_imprint(imprint.as_ref());
        let color = normalize_token(color.as_ref());
        let shape = normalize_token(shape.as_ref());

        for (field, value) in [("imprint", &imprint), ("color", &color), ("shape", &shape)] {
            if value.is_empty() {
                return Err(PillIdError::malformed(format!("{} is empty", field)));
            }
        }

        Ok(Self {
            imprint,
            color,
            shape,
        })
    }

    pub fn imprint(&self) -> &str {
        &self.imprint
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Imprint with the join character turned back into spaces.
    pub fn imprint_display(&self) -> String {
        self.imprint.replace(IMPRINT_JOIN, " ")
    }
}

fn normalize_imprint(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(&IMPRINT_JOIN.to_string())
}

fn normalize_token(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_fields() {
        let query = FeatureQuery::new("  TEVA   123 ", "White", "ROUND").unwrap();
        assert_eq!(query.imprint(), "TEVA+123");
        assert_eq!(query.color(), "white");
        assert_eq!(query.shape(), "round");
        assert_eq!(query.imprint_display(), "TEVA 123");
    }

    #[test]
    fn test_multi_word_color_keeps_single_spaces() {
        let query = FeatureQuery::new("M 30", "Light  Blue", "Capsule-shape").unwrap();
        assert_eq!(query.color(), "light blue");
        assert_eq!(query.shape(), "capsule-shape");
    }

    #[test]
    fn test_rejects_empty_field() {
        let err = FeatureQuery::new("TEVA", "   ", "round").unwrap_err();
        assert!(matches!(err, PillIdError::MalformedFeatureText { .. }));
        assert!(err.to_string().contains("color"));
    }
}
