//! Identification pipeline.
//!
//! The pipeline orchestrates:
//! - Feature normalization (vision answer → query)
//! - Candidate extraction and ranking (result page → three slots)
//! - Identifier resolution (drug name → interaction checker id)
//! - Interaction report parsing
//! - Labeling and adverse event lookups

pub mod count;
pub mod events;
pub mod extract;
pub mod identifier;
pub mod interactions;
pub mod labeling;
pub mod normalize;
pub mod rank;
pub mod resolve;
pub mod table;

pub use count::{count_instruction, parse_count};
pub use events::SideEffectLookup;
pub use extract::{visible_text, ViewDetailsLocator, DEFAULT_ANCHOR_TEXT, DEFAULT_CONTAINER_TAG};
pub use identifier::{PillIdentifier, PillIdentifierBuilder};
pub use interactions::{ordinal, parse_interactions};
pub use labeling::LabelingFetcher;
pub use normalize::normalize_features;
pub use rank::rank;
pub use resolve::{extract_identifier, IdentifierResolver};
pub use table::{contains_table, extract_table, render_table};
