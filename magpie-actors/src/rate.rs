use crate::actor::{Actor, Context};
use anyhow::Result;
use std::{collections::HashMap, time::Duration};
use tokio::{
    sync::oneshot,
    time::{Instant, sleep},
};

/// Floor applied to configured rates; a zero qps would make deficit
/// waits unbounded.
const MIN_QPS: f64 = 1e-3;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RateKey(pub String);

#[derive(Debug)]
pub enum RateMsg {
    /// Insert/update bucket config.
    Upsert { key: RateKey, qps: f64, burst: u32 },
    /// Acquire `cost` tokens; replies when allowed.
    Acquire {
        key: RateKey,
        cost: u32,
        reply: oneshot::Sender<RatePermit>,
    },
}

#[derive(Debug)]
pub struct RatePermit; // no-op token (ack)

#[derive(Clone, Copy, Debug)]
struct BucketCfg {
    qps: f64,
    burst: f64,
}

#[derive(Debug)]
struct BucketState {
    cfg: BucketCfg,
    tokens: f64,
    last: Instant,
}

impl BucketState {
    fn new(cfg: BucketCfg) -> Self {
        Self {
            cfg,
            tokens: cfg.burst,
            last: Instant::now(),
        }
    }

    /// Returns wait time needed to have `need` tokens available (0 if ready).
    fn needed_wait(&mut self, need: f64, now: Instant) -> Duration {
        // refill
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + dt * self.cfg.qps).min(self.cfg.burst);

        if self.tokens >= need {
            self.tokens -= need;
            Duration::from_millis(0)
        } else {
            let deficit = need - self.tokens;
            let secs = deficit / self.cfg.qps;
            // Reserve the tokens to avoid stampede after sleep
            self.tokens = 0.0;
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Token-bucket rate limiter as an actor.
///
/// Semantics:
/// - `Upsert` creates or updates the bucket for a `RateKey`.
/// - `Acquire` waits (off-actor) until `cost` tokens are available, then replies.
/// - Keys acquired before any `Upsert` get a 1 qps / 1 burst bucket.
///
/// Throughput: controlled by `qps` (steady rate) and `burst` (bucket capacity).
pub struct RateLimiter {
    buckets: HashMap<RateKey, BucketState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    fn upsert(&mut self, key: RateKey, qps: f64, burst: u32) {
        let cfg = BucketCfg {
            qps: qps.max(MIN_QPS),
            burst: f64::from(burst).max(1.0),
        };
        self.buckets
            .entry(key)
            .and_modify(|b| b.cfg = cfg)
            .or_insert_with(|| BucketState::new(cfg));
    }
}

#[async_trait::async_trait]
impl Actor for RateLimiter {
    type Msg = RateMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            RateMsg::Upsert { key, qps, burst } => {
                self.upsert(key, qps, burst);
            }
            RateMsg::Acquire { key, cost, reply } => {
                let now = Instant::now();
                let state = self.buckets.entry(key.clone()).or_insert_with(|| {
                    BucketState::new(BucketCfg {
                        qps: 1.0,
                        burst: 1.0,
                    })
                });
                let wait = state.needed_wait(cost as f64, now);
                // Do not block the actor; wait and reply in a detached task.
                tokio::spawn(async move {
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                    let _ = reply.send(RatePermit);
                });
            }
        }
        Ok(())
    }
}
