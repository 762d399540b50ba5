use crate::actor::{Actor, Addr, Reserved, spawn_actor_reserved};
use crate::registry::Registry;
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use std::collections::HashMap;

/// Two-phase wiring for the actor graph: reserve mailboxes (publishing
/// addresses) first, then start actors with their dependencies injected.
pub struct Builder {
    sys: ActorSystem,
    reg: Registry,
    // Concrete addresses by name for easy wiring.
    addrs: HashMap<String, Box<dyn std::any::Any + Send + Sync>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            sys: ActorSystem::new(),
            reg: Registry::default(),
            addrs: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.reg
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Reserve an actor and publish its `Addr` under `name`.
    pub fn reserve<A>(&mut self, name: &str, mailbox: usize) -> Reserved<A>
    where
        A: Actor,
        A::Msg: Send + 'static,
        Addr<A>: Clone + Send + Sync + 'static,
    {
        let r = spawn_actor_reserved::<A>(name.to_string(), mailbox);
        // publish immediately
        let addr = r.addr();
        self.addrs.insert(name.to_string(), Box::new(addr.clone()));
        self.reg.insert_addr::<A>(name, addr);
        r
    }

    /// Start a previously reserved actor and track its task.
    pub fn start_reserved<A>(&mut self, r: Reserved<A>, actor: A) -> &mut Self
    where
        A: Actor,
        A::Msg: Send + 'static,
        Addr<A>: Clone + Send + Sync + 'static,
    {
        let shutdown_rx = self.sys.shutdown_notifier();
        let h = r.start_with_shutdown(actor, Some(shutdown_rx));
        self.sys.track(async move {
            h.task.await??;
            Ok(())
        });
        self
    }

    /// Get a typed address by name for wiring fanout/fanin.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>>
    where
        Addr<A>: Clone + 'static,
    {
        self.addrs
            .get(name)
            .and_then(|b| b.downcast_ref::<Addr<A>>().cloned())
    }

    /// Drop published addresses and shut the system down, awaiting every
    /// actor task.
    pub async fn graceful_shutdown(mut self) -> Result<()> {
        self.addrs.clear();
        self.reg = Registry::default();
        self.sys.graceful_shutdown().await
    }
}
