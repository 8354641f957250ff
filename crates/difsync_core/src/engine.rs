//! The runtime-engine boundary.
//!
//! The engine owns pointer storage, script execution, and the wire
//! protocol; this layer consumes it through [`RuntimeEngine`] only.
//! Every resolution-returning call may answer immediately or later,
//! depending on how the engine backend is configured; callers must
//! support both (see [`crate::Resolution`]).

use crate::error::{SyncError, SyncResult};
use crate::resolution::{Pending, Resolution};
use difsync_value::{
    DifTypeContainer, DifUpdate, DifValueContainer, Mutability, PointerAddress,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A callback invoked when the engine rebroadcasts an update for an
/// observed address.
pub type UpdateObserver = Box<dyn Fn(PointerAddress, DifUpdate) + Send + Sync>;

/// The external engine consumed by the synchronization layer.
pub trait RuntimeEngine: Send + Sync {
    /// Executes a script with the given arguments.
    fn execute(
        &self,
        script: &str,
        args: &[DifValueContainer],
    ) -> SyncResult<Resolution<DifValueContainer>>;

    /// Creates a pointer owning the given value in the remote store.
    fn create_pointer(
        &self,
        value: DifValueContainer,
        allowed_type: Option<DifTypeContainer>,
        mutability: Mutability,
    ) -> SyncResult<Resolution<PointerAddress>>;

    /// Looks up the value a pointer address names.
    fn resolve_pointer_address(
        &self,
        address: PointerAddress,
    ) -> SyncResult<Resolution<DifValueContainer>>;

    /// Forwards an update to the authoritative store.
    fn update_pointer(&self, address: PointerAddress, update: DifUpdate) -> SyncResult<()>;

    /// Registers an observer for rebroadcast updates on an address.
    fn observe_pointer(
        &self,
        address: PointerAddress,
        observer: UpdateObserver,
    ) -> SyncResult<u64>;

    /// Removes a previously registered observer.
    fn unobserve_pointer(&self, address: PointerAddress, observer_id: u64) -> SyncResult<()>;
}

/// An in-memory engine for testing.
///
/// Pointers live in a table, outgoing updates are recorded for
/// inspection, and observers can be fed updates directly with
/// [`MockEngine::deliver`]. With deferred resolution enabled, every
/// resolution-returning call answers with a pending result that completes
/// on [`MockEngine::flush_deferred`].
#[derive(Default)]
pub struct MockEngine {
    pointers: RwLock<HashMap<PointerAddress, DifValueContainer>>,
    updates: RwLock<Vec<(PointerAddress, DifUpdate)>>,
    observers: RwLock<HashMap<PointerAddress, Vec<(u64, Arc<UpdateObserver>)>>>,
    next_observer: AtomicU64,
    next_address: AtomicU64,
    execute_response: Mutex<Option<DifValueContainer>>,
    defer_resolution: AtomicBool,
    echo_updates: AtomicBool,
    deferred: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl MockEngine {
    /// Creates a new mock engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a fresh 26-byte pointer address.
    pub fn mint_address(&self) -> PointerAddress {
        let counter = self.next_address.fetch_add(1, Ordering::SeqCst) + 1;
        let mut bytes = [0u8; 26];
        bytes[0] = 0xEE;
        bytes[18..26].copy_from_slice(&counter.to_be_bytes());
        PointerAddress::from_full(bytes)
    }

    /// Seeds the pointer table.
    pub fn set_pointer(&self, address: PointerAddress, value: DifValueContainer) {
        self.pointers.write().insert(address, value);
    }

    /// Sets the scripted execute response.
    pub fn set_execute_response(&self, response: DifValueContainer) {
        *self.execute_response.lock() = Some(response);
    }

    /// Switches resolution-returning calls between immediate and pending.
    pub fn set_defer_resolution(&self, defer: bool) {
        self.defer_resolution.store(defer, Ordering::SeqCst);
    }

    /// When enabled, every forwarded update is rebroadcast to the
    /// address's observers, the way an authoritative store echoes.
    pub fn set_echo_updates(&self, echo: bool) {
        self.echo_updates.store(echo, Ordering::SeqCst);
    }

    /// Completes every deferred resolution.
    pub fn flush_deferred(&self) {
        let deferred = std::mem::take(&mut *self.deferred.lock());
        for complete in deferred {
            complete();
        }
    }

    /// Returns the number of uncompleted deferred resolutions.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Returns every recorded outgoing update.
    #[must_use]
    pub fn recorded_updates(&self) -> Vec<(PointerAddress, DifUpdate)> {
        self.updates.read().clone()
    }

    /// Returns the recorded outgoing updates for one address.
    #[must_use]
    pub fn updates_for(&self, address: PointerAddress) -> Vec<DifUpdate> {
        self.updates
            .read()
            .iter()
            .filter(|(addr, _)| *addr == address)
            .map(|(_, update)| update.clone())
            .collect()
    }

    /// Clears the recorded updates.
    pub fn clear_recorded(&self) {
        self.updates.write().clear();
    }

    /// Returns the number of observers registered for an address.
    #[must_use]
    pub fn observer_count(&self, address: PointerAddress) -> usize {
        self.observers
            .read()
            .get(&address)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Delivers an update to every observer of an address, the way the
    /// engine rebroadcasts remote changes.
    pub fn deliver(&self, address: PointerAddress, update: DifUpdate) {
        let observers: Vec<Arc<UpdateObserver>> = self
            .observers
            .read()
            .get(&address)
            .map(|entries| entries.iter().map(|(_, obs)| Arc::clone(obs)).collect())
            .unwrap_or_default();
        // Invoked outside the lock: observers may call back into the engine.
        for observer in observers {
            observer(address, update.clone());
        }
    }

    fn resolve_now_or_defer<T: Send + 'static>(&self, value: T) -> Resolution<T> {
        if self.defer_resolution.load(Ordering::SeqCst) {
            let (completer, pending) = Pending::channel();
            self.deferred
                .lock()
                .push(Box::new(move || completer.complete(Ok(value))));
            Resolution::Pending(pending)
        } else {
            Resolution::Ready(value)
        }
    }
}

impl RuntimeEngine for MockEngine {
    fn execute(
        &self,
        _script: &str,
        _args: &[DifValueContainer],
    ) -> SyncResult<Resolution<DifValueContainer>> {
        let response = self
            .execute_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::engine("no scripted execute response"))?;
        Ok(self.resolve_now_or_defer(response))
    }

    fn create_pointer(
        &self,
        value: DifValueContainer,
        _allowed_type: Option<DifTypeContainer>,
        _mutability: Mutability,
    ) -> SyncResult<Resolution<PointerAddress>> {
        let address = self.mint_address();
        self.pointers.write().insert(address, value);
        Ok(self.resolve_now_or_defer(address))
    }

    fn resolve_pointer_address(
        &self,
        address: PointerAddress,
    ) -> SyncResult<Resolution<DifValueContainer>> {
        let value = self
            .pointers
            .read()
            .get(&address)
            .cloned()
            .ok_or_else(|| SyncError::engine(format!("unknown pointer address {address}")))?;
        Ok(self.resolve_now_or_defer(value))
    }

    fn update_pointer(&self, address: PointerAddress, update: DifUpdate) -> SyncResult<()> {
        self.updates.write().push((address, update.clone()));
        if self.echo_updates.load(Ordering::SeqCst) {
            self.deliver(address, update);
        }
        Ok(())
    }

    fn observe_pointer(
        &self,
        address: PointerAddress,
        observer: UpdateObserver,
    ) -> SyncResult<u64> {
        let id = self.next_observer.fetch_add(1, Ordering::SeqCst) + 1;
        self.observers
            .write()
            .entry(address)
            .or_default()
            .push((id, Arc::new(observer)));
        Ok(id)
    }

    fn unobserve_pointer(&self, address: PointerAddress, observer_id: u64) -> SyncResult<()> {
        let mut observers = self.observers.write();
        let entries = observers
            .get_mut(&address)
            .ok_or_else(|| SyncError::engine(format!("no observers for {address}")))?;
        let before = entries.len();
        entries.retain(|(id, _)| *id != observer_id);
        if entries.len() == before {
            return Err(SyncError::engine(format!(
                "unknown engine observer {observer_id} for {address}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use difsync_value::DifValue;

    fn text_container(text: &str) -> DifValueContainer {
        DifValueContainer::from(DifValue::text(text))
    }

    #[test]
    fn pointer_roundtrip() {
        let engine = MockEngine::new();
        let address = engine.mint_address();
        engine.set_pointer(address, text_container("hello"));

        let resolved = engine
            .resolve_pointer_address(address)
            .unwrap()
            .expect_ready()
            .unwrap();
        assert_eq!(resolved, text_container("hello"));
    }

    #[test]
    fn unknown_pointer_is_an_error() {
        let engine = MockEngine::new();
        let address = engine.mint_address();
        assert!(engine.resolve_pointer_address(address).is_err());
    }

    #[test]
    fn minted_addresses_are_unique() {
        let engine = MockEngine::new();
        assert_ne!(engine.mint_address(), engine.mint_address());
    }

    #[test]
    fn deferred_resolution_completes_on_flush() {
        let engine = MockEngine::new();
        let address = engine.mint_address();
        engine.set_pointer(address, text_container("later"));
        engine.set_defer_resolution(true);

        let resolution = engine.resolve_pointer_address(address).unwrap();
        assert_eq!(engine.deferred_count(), 1);

        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        resolution.on_ready(move |result| {
            *seen_clone.lock() = Some(result.unwrap());
        });

        assert!(seen.lock().is_none());
        engine.flush_deferred();
        assert_eq!(*seen.lock(), Some(text_container("later")));
    }

    #[test]
    fn updates_are_recorded() {
        let engine = MockEngine::new();
        let address = engine.mint_address();
        engine
            .update_pointer(address, DifUpdate::clear("@local"))
            .unwrap();

        let updates = engine.updates_for(address);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].source, "@local");
    }

    #[test]
    fn observers_receive_delivered_updates() {
        let engine = MockEngine::new();
        let address = engine.mint_address();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let id = engine
            .observe_pointer(
                address,
                Box::new(move |_addr, update| seen_clone.lock().push(update)),
            )
            .unwrap();

        engine.deliver(address, DifUpdate::clear("@remote"));
        assert_eq!(seen.lock().len(), 1);

        engine.unobserve_pointer(address, id).unwrap();
        engine.deliver(address, DifUpdate::clear("@remote"));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn echo_rebroadcasts_forwarded_updates() {
        let engine = MockEngine::new();
        engine.set_echo_updates(true);
        let address = engine.mint_address();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        engine
            .observe_pointer(
                address,
                Box::new(move |_addr, update| seen_clone.lock().push(update)),
            )
            .unwrap();

        engine
            .update_pointer(address, DifUpdate::clear("@local"))
            .unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn double_unobserve_is_an_engine_error() {
        let engine = MockEngine::new();
        let address = engine.mint_address();
        let id = engine
            .observe_pointer(address, Box::new(|_, _| {}))
            .unwrap();

        engine.unobserve_pointer(address, id).unwrap();
        assert!(engine.unobserve_pointer(address, id).is_err());
    }
}
