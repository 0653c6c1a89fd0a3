//! Vision model implementations.
//!
//! This module provides a reference implementation of the `VisionModel`
//! trait. Applications can use it directly or implement their own.

mod openai;

pub use openai::OpenAIVision;
