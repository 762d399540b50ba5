//! Actor that drives keyword searches against one social platform and feeds
//! collected posts into the analysis pipeline.
//!
//! Each page fetch takes a rate permit first, so platform quotas hold no
//! matter how many keywords are queued. Platform errors are reported in the
//! command's outcome rather than stopping the actor; only infrastructure
//! failures (a dropped peer mailbox) do that.

use crate::actor::{Actor, Addr, Context};
use crate::analyzer::AnalyzeActor;
use crate::rate::{RateKey, RateLimiter, RateMsg};
use crate::{AnalyzeMsg, SearchCmd, SearchOutcome};
use anyhow::{Result, anyhow, ensure};
use magpie_social::{SearchPage, SocialClient};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

const DEFAULT_PAGE_SIZE: u32 = 50;

pub struct CollectorActor {
    client: Arc<dyn SocialClient>,
    rate_key: RateKey,
    rate_limiter: Addr<RateLimiter>,
    out: Addr<AnalyzeActor>,
    page_size: u32,
}

impl CollectorActor {
    pub fn new(
        rate_limiter: Addr<RateLimiter>,
        rate_key: RateKey,
        out: Addr<AnalyzeActor>,
        client: Arc<dyn SocialClient>,
    ) -> Self {
        Self {
            client,
            rate_key,
            rate_limiter,
            out,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, n: u32) -> Self {
        self.page_size = n.max(1);
        self
    }
}

#[async_trait::async_trait]
impl Actor for CollectorActor {
    type Msg = SearchCmd;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let SearchCmd {
            keyword,
            window,
            limit,
            run,
            reply,
        } = msg;
        let platform = self.client.platform();

        ensure!(
            window.end > window.start,
            "invalid search window: end ({}) is not after start ({})",
            window.end,
            window.start
        );

        info!(platform=%platform, keyword=%keyword, limit, "collect.start");

        let mut collected = 0u32;
        let mut failed = false;
        let mut cursor: Option<String> = None;

        while collected < limit {
            acquire_rate_permit(&self.rate_limiter, self.rate_key.clone(), 1).await?;

            let page_size = self.page_size.min(limit - collected);
            let page = match self
                .client
                .search_page(&keyword, &window, page_size, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        platform=%platform,
                        keyword=%keyword,
                        error=?err,
                        "collect.page_failed"
                    );
                    failed = true;
                    break;
                }
            };

            let SearchPage { posts, next } = page;
            if posts.is_empty() {
                break;
            }
            for post in posts {
                if collected >= limit {
                    break;
                }
                if self.out.send(AnalyzeMsg::Post { run, post }).await.is_err() {
                    return Err(anyhow!("analyzer mailbox dropped"));
                }
                collected += 1;
            }

            match next {
                Some(token) if collected < limit => cursor = Some(token),
                _ => break,
            }
        }

        info!(
            platform=%platform,
            keyword=%keyword,
            collected,
            failed,
            "collect.done"
        );
        let _ = reply.send(SearchOutcome {
            platform,
            keyword,
            collected,
            failed,
        });
        Ok(())
    }
}

async fn acquire_rate_permit(
    rate_limiter: &Addr<RateLimiter>,
    key: RateKey,
    cost: u32,
) -> Result<()> {
    let (permit_tx, permit_rx) = oneshot::channel();
    rate_limiter
        .send(RateMsg::Acquire {
            key,
            cost,
            reply: permit_tx,
        })
        .await
        .map_err(|_| anyhow!("rate limiter actor dropped"))?;

    permit_rx
        .await
        .map_err(|_| anyhow!("failed to receive rate permit from limiter"))?;

    Ok(())
}
