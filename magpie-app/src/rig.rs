//! Wires configuration into a running actor set: rate limiter and store
//! first, then the analyzer, then collectors and the crawler with their
//! dependencies injected.

use anyhow::{Context, Result, anyhow, bail};
use magpie_actors::{
    AnalyzeMsg,
    actor::{Addr, Reserved},
    analyzer::AnalyzeActor,
    builder::Builder,
    collector::CollectorActor,
    crawler::{CapturerFactory, CrawlActor},
    rate::{RateKey, RateLimiter, RateMsg},
    store::{StoreActor, init_schema},
};
use magpie_config::{AgentDetails, CrawlConfig, MagpieConfig};
use magpie_social::{
    SocialClient, mastodon::MastodonApi, reddit::RedditApi, twitter::TwitterApi,
};
use magpie_web::crawl::CrawlLimits;
use magpie_web::fetch::{FantocciniCapturer, HttpCapturer, PageCapturer};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAILBOX: usize = 1024;

/// The assembled pipeline for one process.
pub struct Rig {
    builder: Builder,
    collectors: Vec<CollectorPool>,
    crawler: Option<Addr<CrawlActor>>,
    analyzer: Option<Addr<AnalyzeActor>>,
    store: Addr<StoreActor>,
    cancel: CancellationToken,
}

impl Rig {
    pub fn collectors(&self) -> &[CollectorPool] {
        &self.collectors
    }
    pub fn crawler(&self) -> Option<&Addr<CrawlActor>> {
        self.crawler.as_ref()
    }
    pub fn store(&self) -> &Addr<StoreActor> {
        &self.store
    }
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Barrier through the analyzer and the store write queue. When the ack
    /// comes back, every post and page handed to the pipeline before this
    /// call has been committed.
    pub async fn flush(&self) -> Result<()> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(());
        };
        let (tx, rx) = oneshot::channel();
        analyzer
            .send(AnalyzeMsg::Barrier(tx))
            .await
            .map_err(|_| anyhow!("analyzer mailbox closed"))?;
        rx.await.map_err(|_| anyhow!("analyzer dropped the flush ack"))?;
        Ok(())
    }

    pub async fn graceful_shutdown(self) -> Result<()> {
        self.builder.graceful_shutdown().await
    }
}

/// Workers started for one configured agent. Commands are spread across
/// the workers round-robin.
pub struct CollectorPool {
    pub spec_id: String,
    pub kind: &'static str,
    workers: Vec<Addr<CollectorActor>>,
}

impl CollectorPool {
    pub fn worker(&self, idx: usize) -> &Addr<CollectorActor> {
        &self.workers[idx % self.workers.len()]
    }
}

// helpers
fn collect_rate_key(kind: &str, spec_id: &str) -> RateKey {
    RateKey(format!("{kind}:search:{spec_id}"))
}

fn default_rate(kind: &str) -> (f64, u32) {
    match kind {
        "twitter" => (3.0, 30), // tune per bearer token
        _ => (1.0, 5),
    }
}

async fn make_pool(url: &str) -> Result<SqlitePool> {
    let pool = SqlitePool::connect(url)
        .await
        .with_context(|| format!("opening database {url}"))?;
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn build(cfg: &MagpieConfig, want_crawler: bool) -> Result<Rig> {
    let mut b = Builder::new();
    let cancel = CancellationToken::new();

    // -------- PHASE 1: RESERVE EVERYTHING --------
    let mut r_collect: HashMap<String, Vec<Reserved<CollectorActor>>> = HashMap::new();
    let mut crawl_cfg: Option<CrawlConfig> = None;

    // infra
    let r_rate = b.reserve::<RateLimiter>("rate:main", DEFAULT_MAILBOX);
    let r_store = b.reserve::<StoreActor>("store:main", DEFAULT_MAILBOX);
    let r_analyze = b.reserve::<AnalyzeActor>("analyze:main", DEFAULT_MAILBOX);

    // app actors
    for spec in cfg.agents.iter().filter(|a| a.enabled.unwrap_or(true)) {
        let conc = spec.concurrency.unwrap_or(1).max(1) as usize;

        match &spec.details {
            AgentDetails::Web { config } => {
                // First enabled web agent decides the crawl shape.
                if crawl_cfg.is_none() {
                    crawl_cfg = Some(config.clone());
                }
            }
            _ => {
                let mut v = Vec::with_capacity(conc);
                for i in 0..conc {
                    let name = format!("{}#{}", spec.id, i);
                    v.push(b.reserve::<CollectorActor>(&name, DEFAULT_MAILBOX));
                }
                r_collect.insert(spec.id.clone(), v);
            }
        }
    }
    let r_crawl = want_crawler.then(|| b.reserve::<CrawlActor>("crawl:main", DEFAULT_MAILBOX));

    // -------- PHASE 2a: START INFRA FIRST --------
    // Start RateLimiter and Store so we can provision keys and wire outputs.
    b.start_reserved(r_rate, RateLimiter::new());
    let pool = make_pool(&cfg.storage.database_url).await?;
    b.start_reserved(r_store, StoreActor::new(pool));

    // Resolve infra addrs
    let rate_addr: Addr<RateLimiter> = b.addr("rate:main").expect("rate addr");
    let store_addr: Addr<StoreActor> = b.addr("store:main").expect("store addr");

    // -------- PHASE 2b: PROVISION RATE LIMITS (policy lives here) --------
    // Per-spec overrides from config win; per-kind defaults otherwise.
    for spec in cfg.agents.iter().filter(|a| a.enabled.unwrap_or(true)) {
        if matches!(spec.details, AgentDetails::Web { .. }) {
            continue;
        }
        let kind = spec.details.kind();
        let key = collect_rate_key(kind, &spec.id);
        let (qps, burst) = match spec.rate {
            Some(r) => (r.qps, r.burst),
            None => default_rate(kind),
        };
        rate_addr
            .send(RateMsg::Upsert { key, qps, burst })
            .await
            .map_err(|_| anyhow!("rate limiter mailbox closed while provisioning '{}'", spec.id))?;
    }

    // -------- PHASE 2c: START APP ACTORS (deps injected) --------
    b.start_reserved(r_analyze, AnalyzeActor::new(store_addr.clone()));
    let analyze_addr: Addr<AnalyzeActor> = b.addr("analyze:main").expect("analyzer addr");

    let mut collectors = Vec::new();
    for spec in cfg.agents.iter().filter(|a| a.enabled.unwrap_or(true)) {
        match &spec.details {
            AgentDetails::Web { .. } => {}
            details => {
                let client = build_social_client(details)?;
                let key = collect_rate_key(details.kind(), &spec.id);

                if let Some(workers) = r_collect.remove(&spec.id) {
                    let mut addrs = Vec::with_capacity(workers.len());
                    for r in workers.into_iter() {
                        addrs.push(r.addr());
                        let actor = CollectorActor::new(
                            rate_addr.clone(),
                            key.clone(), // pooled across this agent's workers
                            analyze_addr.clone(),
                            Arc::clone(&client),
                        );
                        b.start_reserved(r, actor);
                    }
                    collectors.push(CollectorPool {
                        spec_id: spec.id.clone(),
                        kind: details.kind(),
                        workers: addrs,
                    });
                }
            }
        }
    }

    let crawler = match r_crawl {
        Some(r) => {
            let cc = crawl_cfg.unwrap_or_default();
            let actor = CrawlActor::new(
                capturer_factory(&cc),
                crawl_limits(&cc),
                analyze_addr.clone(),
                cancel.clone(),
            );
            let addr = r.addr();
            b.start_reserved(r, actor);
            Some(addr)
        }
        None => None,
    };

    Ok(Rig {
        builder: b,
        collectors,
        crawler,
        analyzer: Some(analyze_addr),
        store: store_addr,
        cancel,
    })
}

/// Store-only rig for `report` and `stats`, which never touch the
/// platform clients and should not require their credentials.
pub async fn build_store_only(cfg: &MagpieConfig) -> Result<Rig> {
    let mut b = Builder::new();
    let r_store = b.reserve::<StoreActor>("store:main", DEFAULT_MAILBOX);
    let pool = make_pool(&cfg.storage.database_url).await?;
    b.start_reserved(r_store, StoreActor::new(pool));
    let store = b.addr("store:main").expect("store addr");

    Ok(Rig {
        builder: b,
        collectors: Vec::new(),
        crawler: None,
        analyzer: None,
        store,
        cancel: CancellationToken::new(),
    })
}

fn build_social_client(details: &AgentDetails) -> Result<Arc<dyn SocialClient>> {
    match details {
        AgentDetails::Twitter { config } => Ok(Arc::new(TwitterApi::new(
            &config.endpoint,
            config.bearer_token.clone(),
        )?)),
        AgentDetails::Reddit { config } => Ok(Arc::new(RedditApi::new(
            &config.endpoint,
            config.user_agent.clone(),
        )?)),
        AgentDetails::Mastodon { config } => Ok(Arc::new(MastodonApi::new(
            &config.endpoint,
            config.access_token.clone(),
        )?)),
        AgentDetails::Web { .. } => bail!("web agents do not provide a social client"),
    }
}

fn capturer_factory(cfg: &CrawlConfig) -> CapturerFactory {
    if cfg.browser {
        let webdriver = cfg.webdriver_url.clone();
        Box::new(move |_seed| {
            Ok(Arc::new(FantocciniCapturer::new(webdriver.clone(), true)) as Arc<dyn PageCapturer>)
        })
    } else {
        let user_agent = cfg.user_agent.clone();
        let timeout = Duration::from_secs(cfg.timeout_secs);
        Box::new(move |seed| {
            Ok(Arc::new(HttpCapturer::for_site(seed, &user_agent, timeout)?)
                as Arc<dyn PageCapturer>)
        })
    }
}

fn crawl_limits(cfg: &CrawlConfig) -> CrawlLimits {
    CrawlLimits {
        max_depth: cfg.max_depth,
        max_pages: cfg.max_pages_per_domain,
        request_delay: Duration::from_millis(cfg.request_delay_ms),
    }
}
