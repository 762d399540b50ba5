//! Twitter/X API integration surface exposed to the collection loop.
//!
//! Submodules provide the HTTP client wrapper, JSON extraction helpers, and
//! strongly typed response models for `/2/tweets/search/recent`.
pub mod client;
pub mod extract;
pub mod types;

pub use client::TwitterApi;
