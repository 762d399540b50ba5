//! End-to-end exercises of the collection pipeline against an in-memory
//! database: collectors and the crawler feeding the analyzer, the analyzer
//! feeding the store, barriers flushed before every query.

use anyhow::Result;
use async_trait::async_trait;
use magpie_actors::actor::{Addr, spawn_actor};
use magpie_actors::analyzer::AnalyzeActor;
use magpie_actors::collector::CollectorActor;
use magpie_actors::crawler::{CapturerFactory, CrawlActor};
use magpie_actors::rate::{RateKey, RateLimiter, RateMsg};
use magpie_actors::store::{StoreActor, init_schema};
use magpie_actors::{
    AnalyzeMsg, CrawlCmd, CrawlOutcome, ResearchContext, SearchCmd, SearchOutcome, StoreMsg,
};
use magpie_analysis::{AnalyzedPost, PainPoint, analyze_text};
use magpie_social::{Platform, PostArtifact, SearchPage, SearchWindow, SocialClient};
use magpie_web::PageArtifact;
use magpie_web::crawl::CrawlLimits;
use magpie_web::fetch::{PageCapture, PageCapturer};
use sqlx::sqlite::SqlitePoolOptions;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

const NEGATIVE_TEXT: &str = "The delivery came late and support was useless.";
const POSITIVE_TEXT: &str = "Setup was quick and it works great.";

struct Pipeline {
    store: Addr<StoreActor>,
    analyzer: Addr<AnalyzeActor>,
    rate: Addr<RateLimiter>,
}

async fn pipeline() -> Pipeline {
    // One connection so every handle sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    init_schema(&pool).await.expect("schema init");

    let store = spawn_actor(StoreActor::new(pool), 256);
    let analyzer = spawn_actor(AnalyzeActor::new(store.addr.clone()), 256);
    let rate = spawn_actor(RateLimiter::new(), 64);
    Pipeline {
        store: store.addr,
        analyzer: analyzer.addr,
        rate: rate.addr,
    }
}

fn post(platform: Platform, keyword: &str, n: u32, text: &str) -> PostArtifact {
    PostArtifact {
        platform,
        external_id: format!("{keyword}-{n}"),
        author_handle: Some(format!("user{n}")),
        author_display_name: None,
        text: text.to_string(),
        lang: Some("en".to_string()),
        created_at: Some(OffsetDateTime::now_utc() - time::Duration::days(1)),
        source_url: None,
        urls: Vec::new(),
        mentions: Vec::new(),
        hashtags: Vec::new(),
        metrics: None,
        keyword: keyword.to_string(),
    }
}

fn analyzed(platform: Platform, keyword: &str, n: u32, text: &str) -> AnalyzedPost {
    let post = post(platform, keyword, n, text);
    let analysis = analyze_text(&post.text);
    AnalyzedPost { post, analysis }
}

/// Serves `total` canned posts per keyword, paged by cursor. Even-numbered
/// posts carry negative text, odd-numbered ones positive.
struct FakeClient {
    platform: Platform,
    total: u32,
    healthy: bool,
}

#[async_trait]
impl SocialClient for FakeClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn search_page(
        &self,
        keyword: &str,
        _window: &SearchWindow,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchPage> {
        if !self.healthy {
            anyhow::bail!("platform offline");
        }
        let start: u32 = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + page_size).min(self.total);
        let posts = (start..end)
            .map(|n| {
                let text = if n % 2 == 0 {
                    NEGATIVE_TEXT
                } else {
                    POSITIVE_TEXT
                };
                post(self.platform, keyword, n, text)
            })
            .collect();
        let next = (end < self.total).then(|| end.to_string());
        Ok(SearchPage { posts, next })
    }
}

struct CannedSite {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageCapturer for CannedSite {
    async fn capture(&self, url: &Url) -> Result<PageCapture> {
        match self.pages.get(url.as_str()) {
            Some(html) => Ok(PageCapture {
                http_status: 200,
                html: html.clone(),
            }),
            None => Ok(PageCapture {
                http_status: 404,
                html: String::new(),
            }),
        }
    }
}

fn canned_site() -> Arc<CannedSite> {
    let html = |links: &[&str]| {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{href}\">x</a>"))
            .collect();
        format!("<html><head><title>t</title></head><body><p>Spare parts ship slowly.</p>{anchors}</body></html>")
    };
    let mut pages = HashMap::new();
    pages.insert("https://shop.test/".to_string(), html(&["/a", "/b"]));
    pages.insert("https://shop.test/a".to_string(), html(&[]));
    pages.insert("https://shop.test/b".to_string(), html(&[]));
    Arc::new(CannedSite { pages })
}

async fn provision_rate(p: &Pipeline, key: &RateKey) {
    p.rate
        .send(RateMsg::Upsert {
            key: key.clone(),
            qps: 1000.0,
            burst: 1000,
        })
        .await
        .expect("rate limiter mailbox open");
}

fn collector(p: &Pipeline, key: RateKey, client: FakeClient, page_size: u32) -> Addr<CollectorActor> {
    let actor = CollectorActor::new(
        p.rate.clone(),
        key,
        p.analyzer.clone(),
        Arc::new(client),
    )
    .with_page_size(page_size);
    spawn_actor(actor, 64).addr
}

async fn run_search(
    collector: &Addr<CollectorActor>,
    keyword: &str,
    limit: u32,
    run: Uuid,
) -> SearchOutcome {
    let (tx, rx) = oneshot::channel();
    let cmd = SearchCmd {
        keyword: keyword.to_string(),
        window: SearchWindow::trailing_days(7),
        limit,
        run,
        reply: tx,
    };
    collector.send(cmd).await.ok().expect("collector mailbox open");
    rx.await.expect("collector reports an outcome")
}

async fn flush(analyzer: &Addr<AnalyzeActor>) {
    let (tx, rx) = oneshot::channel();
    analyzer
        .send(AnalyzeMsg::Barrier(tx))
        .await
        .ok()
        .expect("analyzer mailbox open");
    rx.await.expect("barrier ack");
}

async fn list_posts(store: &Addr<StoreActor>, run: Option<Uuid>) -> Vec<AnalyzedPost> {
    let (tx, rx) = oneshot::channel();
    store
        .send(StoreMsg::ListPosts {
            run,
            limit: 500,
            reply: tx,
        })
        .await
        .ok()
        .expect("store mailbox open");
    rx.await.expect("store reply").expect("list_posts")
}

async fn list_pages(store: &Addr<StoreActor>, run: Option<Uuid>) -> Vec<PageArtifact> {
    let (tx, rx) = oneshot::channel();
    store
        .send(StoreMsg::ListPages { run, reply: tx })
        .await
        .ok()
        .expect("store mailbox open");
    rx.await.expect("store reply").expect("list_pages")
}

#[tokio::test]
async fn store_keeps_posts_and_serves_search() {
    let p = pipeline().await;
    let ctx = ResearchContext::new(vec!["headphones".to_string()]);
    let run = ctx.id;

    p.store
        .send(StoreMsg::InsertRun(ctx))
        .await
        .ok()
        .expect("store mailbox open");
    for n in 0..3 {
        let text = if n == 1 { POSITIVE_TEXT } else { NEGATIVE_TEXT };
        let entry = analyzed(Platform::Twitter, "headphones", n, text);
        p.store
            .send(StoreMsg::UpsertPost { run, entry })
            .await
            .ok()
            .expect("store mailbox open");
    }
    // Same record again; the upsert must not duplicate it.
    let dup = analyzed(Platform::Twitter, "headphones", 0, NEGATIVE_TEXT);
    p.store
        .send(StoreMsg::UpsertPost { run, entry: dup })
        .await
        .ok()
        .expect("store mailbox open");
    flush(&p.analyzer).await;

    let (tx, rx) = oneshot::channel();
    p.store
        .send(StoreMsg::SearchPosts {
            query: "delivery".to_string(),
            limit: 10,
            reply: tx,
        })
        .await
        .ok()
        .expect("store mailbox open");
    let hits = rx.await.expect("store reply").expect("search");
    assert!(!hits.is_empty());
    for row in &hits {
        assert!(row.text.contains("delivery"));
        assert!(row.compound < 0.0);
        assert_eq!(row.pain_point.as_deref(), Some("Delivery Issues"));
        assert_eq!(row.run_id.as_deref(), Some(run.to_string().as_str()));
    }

    // Punctuation-only queries skip FTS and the LIKE fallback finds nothing.
    let (tx, rx) = oneshot::channel();
    p.store
        .send(StoreMsg::SearchPosts {
            query: "???".to_string(),
            limit: 10,
            reply: tx,
        })
        .await
        .ok()
        .expect("store mailbox open");
    assert!(rx.await.expect("store reply").expect("search").is_empty());

    let all = list_posts(&p.store, Some(run)).await;
    assert_eq!(all.len(), 3);
    assert!(list_posts(&p.store, Some(Uuid::new_v4())).await.is_empty());

    let (tx, rx) = oneshot::channel();
    p.store
        .send(StoreMsg::KeywordStats { reply: tx })
        .await
        .ok()
        .expect("store mailbox open");
    let stats = rx.await.expect("store reply").expect("keyword stats");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].keyword, "headphones");
    assert_eq!(stats[0].platform, "twitter");
    assert_eq!(stats[0].posts, 3);
    assert_eq!(stats[0].negative, 2);

    let (tx, rx) = oneshot::channel();
    p.store
        .send(StoreMsg::PlatformStats { reply: tx })
        .await
        .ok()
        .expect("store mailbox open");
    let stats = rx.await.expect("store reply").expect("platform stats");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].platform, "twitter");
    assert_eq!(stats[0].posts, 3);
    assert_eq!(stats[0].keywords, 1);
    assert!(stats[0].mean_compound < 0.0);
}

#[tokio::test]
async fn analyzer_tags_posts_before_they_land() {
    let p = pipeline().await;
    let run = Uuid::new_v4();

    p.analyzer
        .send(AnalyzeMsg::Post {
            run,
            post: post(Platform::Reddit, "vacuum", 1, NEGATIVE_TEXT),
        })
        .await
        .ok()
        .expect("analyzer mailbox open");
    flush(&p.analyzer).await;

    let rows = list_posts(&p.store, Some(run)).await;
    assert_eq!(rows.len(), 1);
    let entry = &rows[0];
    assert!(entry.analysis.sentiment.compound < 0.0);
    assert_eq!(entry.analysis.pain_point, Some(PainPoint::DeliveryIssues));
}

#[tokio::test]
async fn collector_pages_through_and_honors_budget() {
    let p = pipeline().await;
    let key = RateKey("tw:search:test".to_string());
    provision_rate(&p, &key).await;

    let addr = collector(
        &p,
        key.clone(),
        FakeClient {
            platform: Platform::Twitter,
            total: 25,
            healthy: true,
        },
        10,
    );

    // Platform runs dry below the budget: everything it has is collected.
    let run = Uuid::new_v4();
    let outcome = run_search(&addr, "toaster", 100, run).await;
    assert_eq!(outcome.platform, Platform::Twitter);
    assert!(!outcome.failed);
    assert_eq!(outcome.collected, 25);
    flush(&p.analyzer).await;
    assert_eq!(list_posts(&p.store, Some(run)).await.len(), 25);

    // Budget smaller than the supply: collection stops at the cap.
    let run = Uuid::new_v4();
    let outcome = run_search(&addr, "kettle", 7, run).await;
    assert!(!outcome.failed);
    assert_eq!(outcome.collected, 7);
    flush(&p.analyzer).await;
    assert_eq!(list_posts(&p.store, Some(run)).await.len(), 7);
}

#[tokio::test]
async fn platform_failure_reports_without_stopping_the_collector() {
    let p = pipeline().await;
    let key = RateKey("rd:search:test".to_string());
    provision_rate(&p, &key).await;

    let addr = collector(
        &p,
        key.clone(),
        FakeClient {
            platform: Platform::Reddit,
            total: 10,
            healthy: false,
        },
        10,
    );

    let outcome = run_search(&addr, "blender", 10, Uuid::new_v4()).await;
    assert!(outcome.failed);
    assert_eq!(outcome.collected, 0);

    // The actor is still serving commands after the failure.
    let outcome = run_search(&addr, "mixer", 10, Uuid::new_v4()).await;
    assert!(outcome.failed);
    assert_eq!(outcome.keyword, "mixer");
}

async fn run_crawl(addr: &Addr<CrawlActor>, seed: &str, run: Uuid) -> CrawlOutcome {
    let (tx, rx) = oneshot::channel();
    let cmd = CrawlCmd {
        seed: Url::parse(seed).expect("seed url"),
        run,
        reply: tx,
    };
    addr.send(cmd).await.ok().expect("crawler mailbox open");
    rx.await.expect("crawler reports an outcome")
}

#[tokio::test]
async fn crawler_streams_a_site_into_the_store() {
    let p = pipeline().await;
    let site = canned_site();
    let factory: CapturerFactory = Box::new(move |_seed| Ok(site.clone() as Arc<dyn PageCapturer>));
    let limits = CrawlLimits {
        max_depth: 2,
        max_pages: 10,
        request_delay: Duration::ZERO,
    };
    let addr = spawn_actor(
        CrawlActor::new(factory, limits, p.analyzer.clone(), CancellationToken::new()),
        64,
    )
    .addr;

    let run = Uuid::new_v4();
    let outcome = run_crawl(&addr, "https://shop.test/", run).await;
    assert!(!outcome.failed);
    assert_eq!(outcome.pages, 3);

    flush(&p.analyzer).await;
    let pages = list_pages(&p.store, Some(run)).await;
    assert_eq!(pages.len(), 3);
    let mut urls: Vec<&str> = pages.iter().map(|pg| pg.url.as_str()).collect();
    urls.sort_unstable();
    assert_eq!(
        urls,
        vec![
            "https://shop.test/",
            "https://shop.test/a",
            "https://shop.test/b"
        ]
    );
    assert!(pages.iter().all(|pg| pg.is_success()));

    // A seed the crawler refuses reports as failed, with the actor intact.
    let outcome = run_crawl(&addr, "ftp://shop.test/", Uuid::new_v4()).await;
    assert!(outcome.failed);
    assert_eq!(outcome.pages, 0);
}
