//! Reddit public search integration.
//!
//! Uses the unauthenticated `search.json` listing endpoint; Reddit only asks
//! for a descriptive User-Agent in return. Pagination runs on `after`
//! fullname cursors.
pub mod client;
pub mod extract;
pub mod types;

pub use client::RedditApi;
