//! Candidate ranking: first-found is best, no secondary scoring.

use crate::types::candidate::{CandidateMatch, Choice, RankedResult, RANKED_SLOTS};
use crate::types::query::FeatureQuery;

/// Keep the first [`RANKED_SLOTS`] entries and fill the rest with the sentinel.
///
/// Empty entries consume a slot of the cap but are dropped, and the
/// remaining ones move up.
pub fn rank(
    query: FeatureQuery,
    candidates: impl IntoIterator<Item = CandidateMatch>,
) -> RankedResult {
    let mut result = RankedResult::empty(query);

    let kept = candidates
        .into_iter()
        .take(RANKED_SLOTS)
        .filter(|c| !c.is_empty());

    for (slot, candidate) in result.choices.iter_mut().zip(kept) {
        *slot = Choice::Match(candidate);
    }

    result
}
