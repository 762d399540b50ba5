//! Actor runtime and the message protocol of the Magpie pipeline.
//!
//! The generic pieces (`actor`, `rate`, `registry`, `system`, `builder`)
//! know nothing about research runs; the domain actors (`collector`,
//! `crawler`, `analyzer`, `store`) wire the collection pipeline together:
//! collectors and the crawler feed the analyzer, the analyzer feeds the
//! store. Commands carry a `oneshot` reply so the driver can await
//! per-keyword and per-site outcomes, and a barrier message chained from
//! analyzer to store tells the driver when everything queued is durable.

pub mod actor;
pub mod analyzer;
pub mod builder;
pub mod collector;
pub mod crawler;
pub mod rate;
pub mod registry;
pub mod store;
pub mod system;

use magpie_analysis::AnalyzedPost;
use magpie_social::{Platform, PostArtifact, SearchWindow};
use magpie_web::PageArtifact;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::oneshot;
use url::Url;
use uuid::Uuid;

/// Identity of one research run; rows written during the run are tagged
/// with its id so reports can be scoped to it later.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResearchContext {
    pub id: Uuid,
    pub keywords: Vec<String>,
    pub started_at: OffsetDateTime,
}

impl ResearchContext {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            keywords,
            started_at: OffsetDateTime::now_utc(),
        }
    }
}

/// One keyword search assignment for a platform collector.
pub struct SearchCmd {
    pub keyword: String,
    pub window: SearchWindow,
    /// Cap on posts collected for this keyword on this platform.
    pub limit: u32,
    pub run: Uuid,
    pub reply: oneshot::Sender<SearchOutcome>,
}

/// What a collector reports back when a [`SearchCmd`] finishes.
#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    pub platform: Platform,
    pub keyword: String,
    pub collected: u32,
    pub failed: bool,
}

/// One site crawl assignment.
pub struct CrawlCmd {
    pub seed: Url,
    pub run: Uuid,
    pub reply: oneshot::Sender<CrawlOutcome>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CrawlOutcome {
    pub seed: Url,
    pub pages: u32,
    pub failed: bool,
}

/// Work for the analyzer stage.
pub enum AnalyzeMsg {
    Post {
        run: Uuid,
        post: PostArtifact,
    },
    /// Pages arrive already extracted; they pass through to the store.
    Page {
        run: Uuid,
        page: PageArtifact,
    },
    /// Fires once everything queued ahead of it is durable in the store.
    Barrier(oneshot::Sender<()>),
}

pub enum StoreMsg {
    InsertRun(ResearchContext),
    UpsertPost {
        run: Uuid,
        entry: AnalyzedPost,
    },
    UpsertPage {
        run: Uuid,
        page: PageArtifact,
    },
    /// Full-text search over stored posts, LIKE fallback included.
    SearchPosts {
        query: String,
        limit: i64,
        reply: oneshot::Sender<anyhow::Result<Vec<PostRow>>>,
    },
    /// Load analyzed posts, optionally restricted to one run.
    ListPosts {
        run: Option<Uuid>,
        limit: i64,
        reply: oneshot::Sender<anyhow::Result<Vec<AnalyzedPost>>>,
    },
    /// Load crawled pages, optionally restricted to one run.
    ListPages {
        run: Option<Uuid>,
        reply: oneshot::Sender<anyhow::Result<Vec<PageArtifact>>>,
    },
    KeywordStats {
        reply: oneshot::Sender<anyhow::Result<Vec<KeywordStatRow>>>,
    },
    PlatformStats {
        reply: oneshot::Sender<anyhow::Result<Vec<PlatformStatRow>>>,
    },
    /// Replies once every write queued before it has committed.
    Flush {
        reply: oneshot::Sender<()>,
    },
}

/// Flat post projection returned by store searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRow {
    pub platform: String,
    pub external_id: String,
    pub keyword: String,
    pub author: Option<String>,
    pub text: String,
    pub compound: f64,
    pub pain_point: Option<String>,
    pub struggle: Option<String>,
    pub created_at: Option<String>,
    pub run_id: Option<String>,
}

/// Mention counts per keyword, split by platform.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordStatRow {
    pub keyword: String,
    pub platform: String,
    pub posts: i64,
    /// Posts whose compound fell below the negative threshold.
    pub negative: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStatRow {
    pub platform: String,
    pub posts: i64,
    pub keywords: i64,
    pub mean_compound: f64,
}
