//! Test fixtures and handler helpers.
//!
//! Provides convenience functions for wiring a handler to an in-memory
//! mock engine and materializing pre-seeded mirrors.

use difsync_core::{
    DifHandler, HandlerConfig, HostValue, MockEngine, RuntimeEngine, SyncedList, SyncedMap,
};
use difsync_value::PointerAddress;
use std::sync::Arc;

/// A handler wired to a mock engine.
pub struct Harness {
    /// The mock engine behind the handler.
    pub engine: Arc<MockEngine>,
    /// The handler under test.
    pub handler: Arc<DifHandler>,
}

impl Harness {
    /// Creates a harness with the default local actor.
    #[must_use]
    pub fn new() -> Self {
        Self::with_actor("@local")
    }

    /// Creates a harness for a named local actor.
    #[must_use]
    pub fn with_actor(actor: &str) -> Self {
        let engine = Arc::new(MockEngine::new());
        let handler = DifHandler::new(
            Arc::clone(&engine) as Arc<dyn RuntimeEngine>,
            HandlerConfig::new(actor),
        );
        Self { engine, handler }
    }

    /// Seeds a pointer holding the given host value and returns its
    /// address.
    pub fn seed_pointer(&self, value: &HostValue) -> PointerAddress {
        let container = self
            .handler
            .convert_to_container(value)
            .expect("seed value must convert");
        let address = self.engine.mint_address();
        self.engine.set_pointer(address, container);
        address
    }

    /// Seeds and materializes a bound list mirror.
    pub fn bound_list(&self, items: Vec<HostValue>) -> Arc<SyncedList> {
        let address = self.seed_pointer(&HostValue::List(items));
        let mirror = self.resolve(address);
        Arc::clone(mirror.as_synced_list().expect("list mirror"))
    }

    /// Seeds and materializes a bound map mirror.
    pub fn bound_map(&self, entries: Vec<(HostValue, HostValue)>) -> Arc<SyncedMap> {
        let address = self.seed_pointer(&HostValue::Dictionary(entries));
        let mirror = self.resolve(address);
        Arc::clone(mirror.as_synced_map().expect("map mirror"))
    }

    /// Resolves an address synchronously.
    pub fn resolve(&self, address: PointerAddress) -> HostValue {
        self.handler
            .resolve_address(address)
            .expect("resolution must start")
            .expect_ready()
            .expect("mock engine answers synchronously")
    }

    /// Returns the outgoing updates recorded for an address.
    #[must_use]
    pub fn outgoing(&self, address: PointerAddress) -> usize {
        self.engine.updates_for(address).len()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_materializes_seeded_lists() {
        let harness = Harness::new();
        let list = harness.bound_list(vec![HostValue::Text("a".into())]);
        assert_eq!(list.len(), 1);
        assert!(list.address().is_some());
    }

    #[test]
    fn harness_materializes_seeded_maps() {
        let harness = Harness::new();
        let map = harness.bound_map(vec![(
            HostValue::Text("k".into()),
            HostValue::Decimal(1.0),
        )]);
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(&HostValue::Text("k".into())),
            Some(HostValue::Decimal(1.0))
        );
    }
}
