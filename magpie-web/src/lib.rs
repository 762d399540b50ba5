//! Web page acquisition and extraction utilities.
//!
//! - Capture trait with plain-HTTP and Fantoccini-backed implementations
//!   (`fetch`)
//! - DOM-based HTML extraction (`extract`)
//! - Bounded same-host breadth-first crawling (`crawl`)

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;

pub mod crawl;
pub mod extract;
pub mod fetch;

/// A fetched and extracted page, the crawler's unit of output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageArtifact {
    pub url: Url,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: Option<Url>,
    /// Visible text with boilerplate subtrees removed.
    pub text: String,
    /// blake3 of the raw HTML, for change detection across runs.
    pub html_checksum: String,
    pub http_status: u16,
    /// Link distance from the crawl seed.
    pub depth: u32,
    pub retrieved_at: OffsetDateTime,
    /// Same-host links discovered on the page, before dedup.
    pub links_found: u32,
}

impl PageArtifact {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}
