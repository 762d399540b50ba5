//! Actor that walks seed sites with the bounded crawler and feeds captured
//! pages into the analysis pipeline.
//!
//! One command crawls one seed to completion. A failed seed reports through
//! its outcome; the actor itself only stops when a peer mailbox goes away.

use crate::actor::{Actor, Addr, Context};
use crate::analyzer::AnalyzeActor;
use crate::{AnalyzeMsg, CrawlCmd, CrawlOutcome};
use anyhow::{Result, anyhow};
use futures::StreamExt;
use magpie_web::crawl::{CrawlLimits, crawl_site};
use magpie_web::fetch::PageCapturer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Builds a capturer scoped to one seed. Per-seed construction lets HTTP
/// capturers pin their client and politeness state to the seed's origin.
pub type CapturerFactory = Box<dyn Fn(&Url) -> Result<Arc<dyn PageCapturer>> + Send + Sync>;

pub struct CrawlActor {
    make_capturer: CapturerFactory,
    limits: CrawlLimits,
    out: Addr<AnalyzeActor>,
    cancel: CancellationToken,
}

impl CrawlActor {
    pub fn new(
        make_capturer: CapturerFactory,
        limits: CrawlLimits,
        out: Addr<AnalyzeActor>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            make_capturer,
            limits,
            out,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl Actor for CrawlActor {
    type Msg = CrawlCmd;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let CrawlCmd { seed, run, reply } = msg;
        info!(seed=%seed, "crawl.start");

        let capturer = match (self.make_capturer)(&seed) {
            Ok(c) => c,
            Err(err) => {
                warn!(seed=%seed, error=?err, "crawl.capturer_failed");
                let _ = reply.send(CrawlOutcome {
                    seed,
                    pages: 0,
                    failed: true,
                });
                return Ok(());
            }
        };

        let mut pages = 0u32;
        let mut failed = false;
        let mut stream = crawl_site(
            capturer,
            seed.clone(),
            self.limits,
            self.cancel.child_token(),
        );
        while let Some(item) = stream.next().await {
            match item {
                Ok(page) => {
                    if self.out.send(AnalyzeMsg::Page { run, page }).await.is_err() {
                        return Err(anyhow!("analyzer mailbox dropped"));
                    }
                    pages += 1;
                }
                Err(err) => {
                    warn!(seed=%seed, error=?err, "crawl.seed_failed");
                    failed = true;
                    break;
                }
            }
        }

        info!(seed=%seed, pages, failed, "crawl.done");
        let _ = reply.send(CrawlOutcome {
            seed,
            pages,
            failed,
        });
        Ok(())
    }
}
