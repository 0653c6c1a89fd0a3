//! Pill Identification Library
//!
//! Turns a photo of a pill into a ranked list of candidate drugs, and
//! cross-references drugs against an interaction checker, product labeling
//! and adverse event reports.
//!
//! # Flow
//!
//! ```text
//! photo ──vision──▶ feature text ──normalize──▶ FeatureQuery
//!                                                   │
//!                                  match page ◀─────┘
//!                                      │ locate + rank
//!                                      ▼
//!                   { imprint, color, shape, 1st/2nd/3rd choice }
//!
//! drug A, drug B ──resolve (browser)──▶ ids ──report──▶ InteractionReport
//! drug ──labeling──▶ sections (text or tables)
//! drug ──events────▶ reported reactions
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pill_id::{PillIdentifier, PillIdConfig};
//! use pill_id::testing::{MockBrowser, MockFetcher, MockStructuredSource};
//!
//! let identifier = PillIdentifier::builder()
//!     .fetcher(Arc::new(MockFetcher::new()))
//!     .browser(Arc::new(MockBrowser::never_redirects()))
//!     .source(Arc::new(MockStructuredSource::new()))
//!     .build()?;
//!
//! let ranked = identifier.identify_text("Imprint: I-2\nColor: orange\nShape: round").await?;
//! println!("{}", serde_json::to_string_pretty(&ranked)?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (fetcher, browser, source, vision, locator)
//! - [`types`] - Queries, candidates, interaction and labeling data
//! - [`pipeline`] - Normalizer, ranker, resolver, parsers and the facade
//! - [`fetchers`] - HTTP, rate-limited and openFDA implementations
//! - [`browser`] - WebDriver browser sessions
//! - [`vision`] - OpenAI vision model
//! - [`testing`] - Mock implementations for testing

pub mod browser;
pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod testing;
pub mod traits;
pub mod types;
pub mod vision;

// Re-export core types at crate root
pub use error::{PillIdError, Result};
pub use traits::{
    browser::{BrowserLauncher, BrowserSession},
    fetcher::{DocumentFetcher, FetchedDocument},
    locator::CandidateLocator,
    source::{StructuredEndpoint, StructuredSource},
    vision::VisionModel,
};
pub use types::{
    candidate::{CandidateDetails, CandidateMatch, Choice, RankedResult, NOT_AVAILABLE},
    config::{HttpConfig, PillIdConfig, ResolverConfig, DEFAULT_VISION_INSTRUCTION},
    events::{ChoiceSideEffects, IdentifiedPill, SideEffects, SIDE_EFFECTS_UNAVAILABLE},
    interaction::{DrugIdentifier, InteractionRecord, InteractionReport},
    labeling::{CellValue, LabelingEntry, LabelingSection, SectionKey, TableRow},
    query::FeatureQuery,
};

// Re-export pipeline components
pub use pipeline::{
    extract_table, normalize_features, parse_interactions, rank, render_table, IdentifierResolver,
    PillIdentifier, PillIdentifierBuilder, ViewDetailsLocator,
};

// Re-export implementations
pub use browser::WebDriverLauncher;
pub use fetchers::{HttpFetcher, OpenFdaClient, RateLimitedFetcher};
pub use vision::OpenAIVision;

// Re-export testing utilities
pub use testing::{MockBrowser, MockFetcher, MockStructuredSource, MockVision};
