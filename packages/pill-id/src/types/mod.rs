//! Data types for queries, candidates, interactions and labeling.

pub mod candidate;
pub mod config;
pub mod events;
pub mod interaction;
pub mod labeling;
pub mod query;
