use crate::actor::{Actor, Addr};
use dashmap::DashMap;
use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Thread-safe registry for sharing typed values (usually `Addr<T>`).
///
/// Components are wired after spawn through named lookups, so the wiring
/// layer never needs one giant constructor that knows every actor.
#[derive(Default, Clone)]
pub struct Registry {
    by_name: Arc<DashMap<String, Box<dyn Any + Send + Sync>>>,
    by_type: Arc<DashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Registry {
    pub fn insert_named<T: Send + Sync + 'static>(&self, name: impl Into<String>, value: T) {
        self.by_name.insert(name.into(), Box::new(value));
    }

    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.by_type.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get_named<T: Send + Sync + 'static + Clone>(&self, name: &str) -> Option<T> {
        self.by_name.get(name)?.downcast_ref::<T>().cloned()
    }

    pub fn get<T: Send + Sync + 'static + Clone>(&self) -> Option<T> {
        self.by_type
            .get(&TypeId::of::<T>())?
            .downcast_ref::<T>()
            .cloned()
    }

    /// Publish an actor address under a name, namespaced by its type.
    pub fn insert_addr<A: Actor>(&self, name: &str, addr: Addr<A>)
    where
        Addr<A>: Clone + Send + Sync + 'static,
    {
        let key = format!("{}::{}", std::any::type_name::<Addr<A>>(), name);
        self.insert_named(key, addr);
    }

    pub fn get_addr<A: Actor>(&self, name: &str) -> Option<Addr<A>>
    where
        Addr<A>: Clone + Send + Sync + 'static,
    {
        let key = format!("{}::{}", std::any::type_name::<Addr<A>>(), name);
        self.get_named(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Context, spawn_actor_reserved};
    use anyhow::Result;

    struct Probe;

    #[async_trait::async_trait]
    impl Actor for Probe {
        type Msg = ();
        async fn handle(&mut self, _msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn addresses_round_trip_by_name() {
        let reg = Registry::default();
        let reserved = spawn_actor_reserved::<Probe>("probe:main", 4);
        reg.insert_addr::<Probe>("probe:main", reserved.addr());

        assert!(reg.get_addr::<Probe>("probe:main").is_some());
        assert!(reg.get_addr::<Probe>("probe:other").is_none());
    }

    #[test]
    fn typed_slot_holds_one_value() {
        let reg = Registry::default();
        reg.insert::<u32>(7);
        reg.insert::<u32>(11);

        assert_eq!(reg.get::<u32>(), Some(11));
        assert_eq!(reg.get::<i64>(), None);
    }
}
