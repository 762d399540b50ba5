use anyhow::{Result, anyhow, bail};
use clap::Parser;
use cli::{Cli, Commands, ExportFormat};
use magpie_actors::{
    CrawlCmd, ResearchContext, SearchCmd, StoreMsg, actor::Addr, store::StoreActor,
};
use magpie_analysis::{ResearchStats, compile_stats};
use magpie_common::observability::{LogConfig, LogFormat, init_logging};
use magpie_config::{MagpieConfig, MagpieConfigLoader, resolve_config_file};
use magpie_social::SearchWindow;
use tokio::sync::oneshot;
use tracing::{info, warn};
use url::Url;

mod cli;
mod report;
mod rig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Logging first so configuration problems land in the log
    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_logging(LogConfig {
        app_name: "magpie",
        log_dir: cli.log_dir.clone(),
        emit_stderr: true,
        format: log_format,
        default_filter: "info",
    })?;

    // 2) Load config (env wins); an explicit --config must exist, a
    //    discovered one may be absent
    let mut loader = MagpieConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    } else if let Some(path) = resolve_config_file(None) {
        loader = loader.with_optional_file(path);
    }
    let cfg: MagpieConfig = loader.load()?;

    match cli.command {
        Commands::Run {
            keywords,
            sites,
            days_back,
            max_items,
            format,
        } => cmd_run(&cfg, keywords, sites, days_back, max_items, format).await,
        Commands::Report { query, limit } => cmd_report(&cfg, &query, limit).await,
        Commands::Stats => cmd_stats(&cfg).await,
    }
}

async fn cmd_run(
    cfg: &MagpieConfig,
    keywords: Vec<String>,
    sites: Vec<Url>,
    days_back: u32,
    max_items: u32,
    format: ExportFormat,
) -> Result<()> {
    let rig = rig::build(cfg, !sites.is_empty()).await?;
    if rig.collectors().is_empty() && rig.crawler().is_none() {
        rig.graceful_shutdown().await?;
        bail!("no enabled agents in the configuration and no --site seeds given");
    }

    let ctx = ResearchContext::new(keywords.clone());
    info!(run_id = %ctx.id, keywords = ?ctx.keywords, days_back, max_items, "run.start");
    rig.store()
        .send(StoreMsg::InsertRun(ctx.clone()))
        .await
        .map_err(|_| anyhow!("store mailbox closed"))?;

    // Ctrl-C stops crawls early; keyword searches stop at their budget.
    let cancel = rig.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling crawls");
            cancel.cancel();
        }
    });

    let window = SearchWindow::trailing_days(days_back);
    let mut search_waits = Vec::new();
    for pool in rig.collectors() {
        for (i, keyword) in keywords.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            pool.worker(i)
                .send(SearchCmd {
                    keyword: keyword.clone(),
                    window,
                    limit: max_items,
                    run: ctx.id,
                    reply: tx,
                })
                .await
                .map_err(|_| anyhow!("collector '{}' mailbox closed", pool.spec_id))?;
            search_waits.push((format!("{}/{keyword}", pool.spec_id), rx));
        }
    }

    let mut crawl_waits = Vec::new();
    if let Some(crawler) = rig.crawler() {
        for seed in &sites {
            let (tx, rx) = oneshot::channel();
            crawler
                .send(CrawlCmd {
                    seed: seed.clone(),
                    run: ctx.id,
                    reply: tx,
                })
                .await
                .map_err(|_| anyhow!("crawler mailbox closed"))?;
            crawl_waits.push((seed.clone(), rx));
        }
    }

    let dispatched = search_waits.len() + crawl_waits.len();
    let mut failed = 0usize;
    let mut collected = 0u64;
    for (label, rx) in search_waits {
        match rx.await {
            Ok(outcome) => {
                if outcome.failed {
                    failed += 1;
                }
                collected += u64::from(outcome.collected);
            }
            Err(_) => {
                failed += 1;
                warn!(%label, "collector dropped its reply");
            }
        }
    }
    let mut crawled = 0u64;
    for (seed, rx) in crawl_waits {
        match rx.await {
            Ok(outcome) => {
                if outcome.failed {
                    failed += 1;
                }
                crawled += u64::from(outcome.pages);
            }
            Err(_) => {
                failed += 1;
                warn!(seed = %seed, "crawler dropped its reply");
            }
        }
    }
    info!(collected, crawled, failed, dispatched, "run.outcomes");

    // Everything handed to the pipeline is committed once this returns.
    rig.flush().await?;

    let posts = ask(rig.store(), |tx| StoreMsg::ListPosts {
        run: Some(ctx.id),
        limit: i64::MAX,
        reply: tx,
    })
    .await??;
    let pages = ask(rig.store(), |tx| StoreMsg::ListPages {
        run: Some(ctx.id),
        reply: tx,
    })
    .await??;

    let stats = compile_stats(&posts, 10);
    let report = report::ResearchReport::new(ctx.id, ctx.keywords.clone(), stats, posts, pages);
    let written = report::export(&cfg.storage.export_dir, format, &report)?;

    println!(
        "Run {} finished: {} posts, {} pages stored ({} of {} commands failed)",
        ctx.id,
        report.stats.total_posts,
        report.pages.len(),
        failed,
        dispatched
    );
    print_pain_points(&report.stats);
    for path in &written {
        println!("  wrote {}", path.display());
    }

    rig.graceful_shutdown().await?;
    if dispatched > 0 && failed == dispatched {
        bail!("all {dispatched} collection commands failed; see the log for details");
    }
    Ok(())
}

async fn cmd_report(cfg: &MagpieConfig, query: &str, limit: i64) -> Result<()> {
    let rig = rig::build_store_only(cfg).await?;
    let rows = ask(rig.store(), |tx| StoreMsg::SearchPosts {
        query: query.to_string(),
        limit,
        reply: tx,
    })
    .await??;

    if rows.is_empty() {
        println!("No stored posts match '{query}'.");
    } else {
        for row in &rows {
            let mut tags = Vec::new();
            if let Some(p) = &row.pain_point {
                tags.push(p.as_str());
            }
            if let Some(s) = &row.struggle {
                tags.push(s.as_str());
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            };
            println!(
                "{:>8}  {:<14} {:+.3}{}  {}",
                row.platform,
                row.keyword,
                row.compound,
                tags,
                one_line(&row.text, 100)
            );
        }
        println!("{} row(s).", rows.len());
    }
    rig.graceful_shutdown().await
}

async fn cmd_stats(cfg: &MagpieConfig) -> Result<()> {
    let rig = rig::build_store_only(cfg).await?;
    let keywords = ask(rig.store(), |tx| StoreMsg::KeywordStats { reply: tx }).await??;
    let platforms = ask(rig.store(), |tx| StoreMsg::PlatformStats { reply: tx }).await??;

    if keywords.is_empty() {
        println!("No stored posts yet.");
    } else {
        println!(
            "{:<20} {:<10} {:>7} {:>9}",
            "keyword", "platform", "posts", "negative"
        );
        for row in &keywords {
            println!(
                "{:<20} {:<10} {:>7} {:>9}",
                row.keyword, row.platform, row.posts, row.negative
            );
        }
        println!();
        println!(
            "{:<10} {:>7} {:>9} {:>9}",
            "platform", "posts", "keywords", "mean"
        );
        for row in &platforms {
            println!(
                "{:<10} {:>7} {:>9} {:>+9.3}",
                row.platform, row.posts, row.keywords, row.mean_compound
            );
        }
    }
    rig.graceful_shutdown().await
}

/// Send one query message to the store and wait for its reply.
async fn ask<T>(
    store: &Addr<StoreActor>,
    make: impl FnOnce(oneshot::Sender<T>) -> StoreMsg,
) -> Result<T> {
    let (tx, rx) = oneshot::channel();
    store
        .send(make(tx))
        .await
        .map_err(|_| anyhow!("store mailbox closed"))?;
    rx.await.map_err(|_| anyhow!("store dropped its reply"))
}

fn print_pain_points(stats: &ResearchStats) {
    if stats.pain_points.is_empty() {
        return;
    }
    println!("Top pain points:");
    let mut pains: Vec<(&String, &u64)> = stats.pain_points.iter().collect();
    pains.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, count) in pains.into_iter().take(5) {
        println!("  {count:>5}  {label}");
    }
}

fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max).collect();
        cut.push('…');
        cut
    }
}
