//! Pill counting through the vision model.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PillIdError, Result};
use crate::types::query::FeatureQuery;

static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Instruction asking for the number of pills matching `query`.
pub fn count_instruction(query: &FeatureQuery) -> String {
    format!(
        "Please count the number of pills with these characteristics: imprint: {}, color: {}, shape: {}. Return nothing but the number.",
        query.imprint_display(),
        query.color(),
        query.shape()
    )
}

/// First run of ASCII digits in the model's answer.
pub fn parse_count(answer: &str) -> Result<u32> {
    let digits = RE_DIGITS
        .find(answer)
        .ok_or_else(|| PillIdError::Vision(format!("no count in answer: {:?}", answer.trim())))?;

    digits
        .as_str()
        .parse()
        .map_err(|_| PillIdError::Vision(format!("count out of range: {}", digits.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("4").unwrap(), 4);
        assert_eq!(parse_count("There are 12 pills, 3 of them chipped.").unwrap(), 12);
        assert!(matches!(parse_count("none"), Err(PillIdError::Vision(_))));
        assert!(parse_count("99999999999999999999").is_err());
    }

    #[test]
    fn test_instruction_names_features() {
        let query = FeatureQuery::new("TEVA 123", "White", "Round").unwrap();
        let text = count_instruction(&query);
        assert!(text.contains("imprint: TEVA 123, color: white, shape: round."));
        assert!(text.ends_with("Return nothing but the number."));
    }
}
