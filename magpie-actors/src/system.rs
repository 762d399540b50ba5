//! Task tracking and shutdown signaling for the actor runtime.
//!
//! Every spawned actor subscribes to the broadcast channel for cooperative
//! shutdown; the `JoinSet` guarantees all tracked tasks are awaited during
//! teardown so their final results surface instead of being dropped.
use anyhow::Result;
use tokio::{sync::broadcast, task::JoinSet};

#[derive(Clone)]
pub struct ShutdownHandle {
    tx: broadcast::Sender<()>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        let _ = self.tx.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

pub struct ActorSystem {
    joinset: JoinSet<Result<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(32);
        Self {
            joinset: JoinSet::new(),
            shutdown_tx,
        }
    }

    pub fn shutdown_notifier(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn track(&mut self, fut: impl std::future::Future<Output = Result<()>> + Send + 'static) {
        self.joinset.spawn(fut);
    }

    /// Signal shutdown and wait for every tracked task; the first task
    /// error aborts the join and is returned.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        while let Some(res) = self.joinset.join_next().await {
            res??;
        }
        Ok(())
    }

    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn graceful_shutdown_joins_tracked_tasks() {
        let mut sys = ActorSystem::new();
        let mut rx = sys.shutdown_notifier();
        sys.track(async move {
            rx.recv().await.ok();
            Ok(())
        });
        sys.graceful_shutdown().await.expect("clean teardown");
    }

    #[tokio::test]
    async fn task_errors_surface_at_teardown() {
        let mut sys = ActorSystem::new();
        sys.track(async { Err(anyhow::anyhow!("task blew up")) });
        assert!(sys.graceful_shutdown().await.is_err());
    }
}
