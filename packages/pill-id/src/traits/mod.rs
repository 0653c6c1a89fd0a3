//! Core trait abstractions for the pill identification pipeline.
//!
//! Every external collaborator sits behind one of these traits so that
//! applications inject concrete clients and tests inject fakes.

pub mod browser;
pub mod fetcher;
pub mod locator;
pub mod source;
pub mod vision;
