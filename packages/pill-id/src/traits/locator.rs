//! Candidate locator trait.
//!
//! The reference site has no stable class names or IDs, so the matching
//! strategy is pluggable and kept apart from ranking and normalization.

use crate::types::candidate::CandidateMatch;

/// Finds candidate entries in a rendered result document.
pub trait CandidateLocator: Send + Sync {
    /// Candidates in document order. No match is an empty vec, never an error.
    fn locate(&self, html: &str) -> Vec<CandidateMatch>;
}
