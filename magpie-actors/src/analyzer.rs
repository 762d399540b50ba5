//! Analysis stage between collection and persistence.
//!
//! Every post is scored and tagged here before it reaches the store, so the
//! store only ever sees enriched records. Pages pass through unchanged; they
//! ride the same mailbox so a barrier covers both kinds.

use crate::actor::{Actor, Addr, Context};
use crate::store::StoreActor;
use crate::{AnalyzeMsg, StoreMsg};
use anyhow::{Result, anyhow};
use magpie_analysis::{AnalyzedPost, analyze_text};
use tracing::debug;

pub struct AnalyzeActor {
    out: Addr<StoreActor>,
}

impl AnalyzeActor {
    pub fn new(out: Addr<StoreActor>) -> Self {
        Self { out }
    }
}

#[async_trait::async_trait]
impl Actor for AnalyzeActor {
    type Msg = AnalyzeMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            AnalyzeMsg::Post { run, post } => {
                let analysis = analyze_text(&post.text);
                debug!(
                    platform=%post.platform,
                    external_id=%post.external_id,
                    compound=analysis.sentiment.compound,
                    pain_point=?analysis.pain_point,
                    struggle=?analysis.struggle,
                    "analyze.post"
                );
                let entry = AnalyzedPost { post, analysis };
                self.out
                    .send(StoreMsg::UpsertPost { run, entry })
                    .await
                    .map_err(|_| anyhow!("store mailbox dropped"))?;
            }
            AnalyzeMsg::Page { run, page } => {
                debug!(url=%page.url, status=page.http_status, "analyze.page");
                self.out
                    .send(StoreMsg::UpsertPage { run, page })
                    .await
                    .map_err(|_| anyhow!("store mailbox dropped"))?;
            }
            AnalyzeMsg::Barrier(reply) => {
                // Forwarded as a store flush so the ack covers every record
                // queued ahead of it.
                self.out
                    .send(StoreMsg::Flush { reply })
                    .await
                    .map_err(|_| anyhow!("store mailbox dropped"))?;
            }
        }
        Ok(())
    }
}
