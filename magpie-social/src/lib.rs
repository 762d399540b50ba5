//! Social platform clients and extractors used by Magpie.
//!
//! Each platform module follows the same layout: a `client` wrapping the
//! shared HTTP client, strongly typed response `types`, and an `extract`
//! module that normalises platform JSON into [`PostArtifact`]. Collection
//! drivers work against the [`SocialClient`] trait so a failing platform can
//! be isolated without special-casing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use url::Url;

pub mod mastodon;
pub mod reddit;
pub mod twitter;

/// Platforms Magpie can collect from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Reddit,
    Mastodon,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
            Platform::Mastodon => "mastodon",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engagement counters, normalised across platforms. Reddit scores map to
/// `like_count`, Mastodon boosts to `repost_count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostMetrics {
    pub like_count: Option<u64>,
    pub repost_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub quote_count: Option<u64>,
    pub bookmark_count: Option<u64>,
}

/// A normalized social post, the unit every downstream stage consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostArtifact {
    pub platform: Platform,
    /// Platform-native identifier, unique within `platform`.
    pub external_id: String,
    pub author_handle: Option<String>,
    pub author_display_name: Option<String>,
    pub text: String,
    pub lang: Option<String>,
    pub created_at: Option<OffsetDateTime>,
    /// Canonical link back to the post.
    pub source_url: Option<Url>,
    /// External URLs mentioned in the post body.
    pub urls: Vec<Url>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
    pub metrics: Option<PostMetrics>,
    /// The search keyword that surfaced this post.
    pub keyword: String,
}

/// Inclusive time window a keyword search covers.
///
/// ```
/// use magpie_social::SearchWindow;
///
/// let window = SearchWindow::trailing_days(7);
/// assert!(window.start < window.end);
/// assert!(!window.contains(window.start - time::Duration::seconds(1)));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SearchWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl SearchWindow {
    /// Build a window ending now and reaching `days` back.
    pub fn trailing_days(days: u32) -> Self {
        let end = OffsetDateTime::now_utc();
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Validated constructor; the end must come after the start.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> anyhow::Result<Self> {
        if end <= start {
            anyhow::bail!("search window end {end} is not after start {start}");
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start && at <= self.end
    }

    /// Whole-day span, rounded up. Used to pick coarse platform buckets.
    pub fn span_days(&self) -> i64 {
        let secs = (self.end - self.start).whole_seconds().max(0);
        (secs + 86_399) / 86_400
    }
}

/// One page of keyword search results plus the cursor for the next one.
///
/// Cursors are platform-opaque: a `next_token` on Twitter, an `after`
/// fullname on Reddit, a `max_id` on Mastodon.
#[derive(Debug)]
pub struct SearchPage {
    pub posts: Vec<PostArtifact>,
    pub next: Option<String>,
}

impl SearchPage {
    pub fn end() -> Self {
        Self {
            posts: Vec::new(),
            next: None,
        }
    }
}

/// A platform search client the collection loop can drive page by page.
///
/// Callers fetch one page per invocation so each underlying HTTP request can
/// be individually rate-gated; pagination policy (budgets, stop conditions)
/// stays with the caller.
#[async_trait]
pub trait SocialClient: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch one page of posts matching `keyword` within `window`.
    ///
    /// Implementations must only return posts inside the window, attach
    /// `keyword` to each artifact, and hand back `next: None` once the
    /// platform is exhausted for this query.
    async fn search_page(
        &self,
        keyword: &str,
        window: &SearchWindow,
        page_size: u32,
        cursor: Option<&str>,
    ) -> anyhow::Result<SearchPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_inverted_bounds() {
        let now = OffsetDateTime::now_utc();
        assert!(SearchWindow::new(now, now).is_err());
        assert!(SearchWindow::new(now, now - Duration::hours(1)).is_err());
        assert!(SearchWindow::new(now - Duration::hours(1), now).is_ok());
    }

    #[test]
    fn span_days_rounds_up() {
        let end = OffsetDateTime::now_utc();
        let w = SearchWindow::new(end - Duration::hours(30), end).unwrap();
        assert_eq!(w.span_days(), 2);
        let w = SearchWindow::new(end - Duration::days(7), end).unwrap();
        assert_eq!(w.span_days(), 7);
    }
}
