//! Mastodon hashtag timeline integration.
//!
//! Keywords are slugified into hashtags and read from the public
//! `/api/v1/timelines/tag/{tag}` endpoint of a configured instance; an access
//! token is only needed where the instance requires one. Pagination runs on
//! `max_id` cursors.
pub mod client;
pub mod extract;
pub mod types;

pub use client::MastodonApi;
