use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use futures::Stream;
use rand::Rng;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::PageArtifact;
use crate::extract::extract_page;
use crate::fetch::PageCapturer;

pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageArtifact>> + Send>>;

/// Bounds for a single-site crawl.
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    /// How many link hops from the seed are expanded (seed is depth 0).
    pub max_depth: u32,
    /// Hard cap on fetched pages for this site.
    pub max_pages: u32,
    /// Minimum gap between requests. Zero disables pacing entirely.
    pub request_delay: Duration,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 100,
            request_delay: Duration::from_millis(1000),
        }
    }
}

/// Breadth-first crawl of a single site, yielding one [`PageArtifact`] per
/// fetched page.
///
/// Only same-host links are followed, deduplicated across the whole crawl.
/// Pages with error statuses are still yielded (the status is part of the
/// record) but their links are not expanded. Capture failures skip the page
/// and keep the crawl going.
pub fn crawl_site(
    capturer: Arc<dyn PageCapturer>,
    seed: Url,
    limits: CrawlLimits,
    cancel: CancellationToken,
) -> PageStream {
    Box::pin(async_stream::try_stream! {
        if !matches!(seed.scheme(), "http" | "https") {
            Err(anyhow!("cannot crawl non-http seed {seed}"))?;
        }

        let mut frontier: VecDeque<(Url, u32)> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(url_key(&seed));
        frontier.push_back((seed.clone(), 0));

        let mut fetched: u32 = 0;
        let mut first = true;

        while let Some((url, depth)) = frontier.pop_front() {
            if fetched >= limits.max_pages {
                tracing::info!(target: "web.crawl", seed = %seed, fetched, "crawl.page_budget_reached");
                break;
            }
            if cancel.is_cancelled() {
                tracing::info!(target: "web.crawl", seed = %seed, fetched, "crawl.cancelled");
                break;
            }

            if !first && !limits.request_delay.is_zero() {
                // Pace requests, with jitter so repeated crawls of the same
                // site do not land on a fixed cadence.
                let jitter_ms = {
                    let mut rng = rand::thread_rng();
                    rng.gen_range(0..=250u64)
                };
                let delay = limits.request_delay + Duration::from_millis(jitter_ms);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!(target: "web.crawl", seed = %seed, fetched, "crawl.cancelled");
                        break;
                    }
                }
            }
            first = false;

            let capture = match capturer.capture(&url).await {
                Ok(capture) => capture,
                Err(error) => {
                    tracing::warn!(target: "web.crawl", url = %url, error = %error, "crawl.capture_failed");
                    continue;
                }
            };
            fetched += 1;

            let extract = extract_page(&url, &capture.html);
            let artifact = PageArtifact {
                domain: url.host_str().unwrap_or_default().to_string(),
                title: extract.title,
                description: extract.description,
                canonical_url: extract.canonical_url,
                text: extract.text,
                html_checksum: blake3::hash(capture.html.as_bytes()).to_hex().to_string(),
                http_status: capture.http_status,
                depth,
                retrieved_at: OffsetDateTime::now_utc(),
                links_found: extract.links.len() as u32,
                url: url.clone(),
            };

            if artifact.is_success() && depth < limits.max_depth {
                for link in extract.links {
                    if seen.insert(url_key(&link)) {
                        frontier.push_back((link, depth + 1));
                    }
                }
            }

            tracing::debug!(
                target: "web.crawl",
                url = %artifact.url,
                status = artifact.http_status,
                depth,
                links = artifact.links_found,
                "crawl.page"
            );
            yield artifact;
        }

        tracing::info!(target: "web.crawl", seed = %seed, fetched, "crawl.finished");
    })
}

// Normalization key for deduping (drop fragment, trim trailing slash)
fn url_key(u: &Url) -> String {
    let mut clone = u.clone();
    clone.set_fragment(None);
    clone.as_str().trim_end_matches('/').to_string()
}
