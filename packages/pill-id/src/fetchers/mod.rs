//! Source implementations.
//!
//! - `HttpFetcher` - reqwest document fetcher with transient-failure retry
//! - `RateLimitedFetcher` - wrapper that adds rate limiting
//! - `OpenFdaClient` - structured labeling and drug-event source

pub mod http;
pub mod openfda;
pub mod rate_limited;

pub use http::{build_client, HttpFetcher};
pub use openfda::OpenFdaClient;
pub use rate_limited::RateLimitedFetcher;
