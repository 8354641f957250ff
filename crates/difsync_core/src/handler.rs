//! The synchronization handler.

use crate::binding::{BindingMeta, BoundValue, HostProperty, TypeBinding};
use crate::config::HandlerConfig;
use crate::endpoint::{Endpoint, EndpointCache};
use crate::engine::{RuntimeEngine, UpdateObserver};
use crate::error::{SyncError, SyncResult};
use crate::host::HostValue;
use crate::list::{ListBinding, SyncedList};
use crate::map::{MapBinding, SyncedMap};
use crate::reference::{RefBinding, ScalarRef};
use crate::registry::TypeRegistry;
use crate::resolution::Resolution;
use difsync_value::{
    core_types, DifProperty, DifTypeContainer, DifUpdate, DifUpdateData, DifValue,
    DifValueContainer, Mutability, PointerAddress,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Handle returned by [`DifHandler::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

struct ObserverRecord {
    address: PointerAddress,
    engine_id: u64,
}

/// A weak reference to a live mirror, keyed by its address.
enum WeakMirror {
    List(Weak<SyncedList>),
    Map(Weak<SyncedMap>),
    Scalar(Weak<ScalarRef>),
}

impl WeakMirror {
    fn downgrade(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::SyncedList(list) => Some(Self::List(Arc::downgrade(list))),
            HostValue::SyncedMap(map) => Some(Self::Map(Arc::downgrade(map))),
            HostValue::Ref(reference) => Some(Self::Scalar(Arc::downgrade(reference))),
            _ => None,
        }
    }

    fn upgrade(&self) -> Option<HostValue> {
        match self {
            Self::List(weak) => weak.upgrade().map(HostValue::SyncedList),
            Self::Map(weak) => weak.upgrade().map(HostValue::SyncedMap),
            Self::Scalar(weak) => weak.upgrade().map(HostValue::Ref),
        }
    }
}

struct MirrorSlot {
    mirror: WeakMirror,
    meta: Arc<BindingMeta>,
    binding: Arc<dyn TypeBinding>,
    engine_observer: Option<u64>,
}

/// The central synchronization façade.
///
/// The handler converts host values to DIF values and back, routes
/// outgoing mutations to the engine, routes incoming updates to the
/// right type binding, resolves pointer addresses (synchronously or
/// asynchronously, as the engine answers), and manages observer
/// registration per address.
///
/// Each pointer address maps to at most one live local mirror: repeated
/// resolutions of the same address yield the identical mirror as long as
/// it is strongly held somewhere. The handler itself holds mirrors only
/// weakly.
pub struct DifHandler {
    pub(crate) engine: Arc<dyn RuntimeEngine>,
    pub(crate) config: HandlerConfig,
    pub(crate) registry: TypeRegistry,
    pub(crate) endpoints: EndpointCache,
    mirrors: RwLock<HashMap<PointerAddress, MirrorSlot>>,
    observers: RwLock<HashMap<u64, ObserverRecord>>,
    next_observer: AtomicU64,
    mutabilities: RwLock<HashMap<PointerAddress, Mutability>>,
}

impl DifHandler {
    /// Creates a handler over the given engine.
    ///
    /// The built-in sequence and keyed-collection bindings are registered
    /// at their core type addresses.
    pub fn new(engine: Arc<dyn RuntimeEngine>, config: HandlerConfig) -> Arc<Self> {
        let handler = Arc::new(Self {
            engine,
            config,
            registry: TypeRegistry::new(),
            endpoints: EndpointCache::new(),
            mirrors: RwLock::new(HashMap::new()),
            observers: RwLock::new(HashMap::new()),
            next_observer: AtomicU64::new(0),
            mutabilities: RwLock::new(HashMap::new()),
        });
        handler
            .registry
            .register(core_types::ARRAY, Arc::new(ListBinding));
        handler
            .registry
            .register(core_types::MAP, Arc::new(MapBinding));
        handler
    }

    /// Returns the local actor's canonical name.
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.config.actor
    }

    /// Registers a type binding for a type address.
    pub fn register_binding(&self, address: PointerAddress, binding: Arc<dyn TypeBinding>) {
        self.registry.register(address, binding);
    }

    /// Resolves an endpoint name through the identity cache.
    pub fn endpoint(&self, name: &str) -> Arc<Endpoint> {
        self.endpoints.resolve(name)
    }

    /// Returns the opaque per-binding metadata for a bound address.
    #[must_use]
    pub fn reference_metadata(&self, address: PointerAddress) -> Option<Arc<BindingMeta>> {
        self.mirrors
            .read()
            .get(&address)
            .map(|slot| Arc::clone(&slot.meta))
    }

    /// Stamps an outgoing update with the local actor and forwards it.
    pub(crate) fn forward_update(
        &self,
        address: PointerAddress,
        data: DifUpdateData,
    ) -> SyncResult<()> {
        let update = DifUpdate::new(self.config.actor.clone(), data);
        self.engine.update_pointer(address, update)
    }

    /// Creates a pointer owning the given host value in the remote store.
    pub fn create_pointer(
        self: &Arc<Self>,
        value: &HostValue,
        allowed_type: Option<DifTypeContainer>,
        mutability: Mutability,
    ) -> SyncResult<Resolution<PointerAddress>> {
        let container = self.convert_to_container(value)?;
        let resolution = self
            .engine
            .create_pointer(container, allowed_type, mutability)?;
        let handler = Arc::clone(self);
        Ok(resolution.and_then(move |address| {
            handler.mutabilities.write().insert(address, mutability);
            Ok(address)
        }))
    }

    /// Resolves a container to a host value.
    ///
    /// Inline containers resolve structurally; address containers go
    /// through the engine and materialize a mirror. Either path may
    /// resolve asynchronously depending on the engine backend.
    pub fn resolve_container(
        self: &Arc<Self>,
        container: DifValueContainer,
    ) -> SyncResult<Resolution<HostValue>> {
        match container {
            DifValueContainer::Inline(value) => self.resolve_dif_value(value),
            DifValueContainer::Address(address) => self.resolve_address(address),
        }
    }

    /// Resolves a pointer address to its local mirror.
    pub fn resolve_address(
        self: &Arc<Self>,
        address: PointerAddress,
    ) -> SyncResult<Resolution<HostValue>> {
        self.prune_mirrors();
        if let Some(mirror) = self.cached_mirror(address) {
            return Ok(Resolution::Ready(mirror));
        }
        let resolution = self.engine.resolve_pointer_address(address)?;
        let handler = Arc::clone(self);
        Ok(resolution.chain(move |container| handler.materialize_pointer(address, container)))
    }

    /// Executes a script through the engine and resolves the result.
    pub fn execute(
        self: &Arc<Self>,
        script: &str,
        args: &[HostValue],
    ) -> SyncResult<Resolution<HostValue>> {
        let args = args
            .iter()
            .map(|value| self.convert_to_container(value))
            .collect::<SyncResult<Vec<_>>>()?;
        let resolution = self.engine.execute(script, &args)?;
        let handler = Arc::clone(self);
        Ok(resolution.chain(move |container| handler.resolve_container(container)))
    }

    /// Registers an observer for updates on an address.
    ///
    /// Observing an address known to be immutable is an error: a value
    /// that can never change has nothing to observe.
    pub fn observe(
        &self,
        address: PointerAddress,
        callback: impl Fn(&DifUpdate) + Send + Sync + 'static,
    ) -> SyncResult<ObserverHandle> {
        if self.mutabilities.read().get(&address).copied() == Some(Mutability::Immutable) {
            return Err(SyncError::ImmutableReferenceViolation { address });
        }
        let engine_id = self
            .engine
            .observe_pointer(address, Box::new(move |_addr, update| callback(&update)))?;
        let handle = ObserverHandle(self.next_observer.fetch_add(1, Ordering::SeqCst) + 1);
        self.observers
            .write()
            .insert(handle.0, ObserverRecord { address, engine_id });
        Ok(handle)
    }

    /// Removes a previously registered observer.
    ///
    /// Unregistering an unknown or already-removed handle is an error,
    /// not a silent no-op; it surfaces double-unregister bugs early.
    pub fn unobserve(&self, handle: ObserverHandle) -> SyncResult<()> {
        let record = self
            .observers
            .write()
            .remove(&handle.0)
            .ok_or(SyncError::ObserverNotFound { handle: handle.0 })?;
        self.engine
            .unobserve_pointer(record.address, record.engine_id)
    }

    /// Delivers an incoming update to the bound mirror for an address.
    ///
    /// This is the engine-facing entry point and is fail-safe: it is
    /// driven by untrusted remote input, so an undeliverable update is
    /// logged and dropped with the mirror left unchanged, never allowed
    /// to crash the delivery path.
    pub fn deliver_update(self: &Arc<Self>, address: PointerAddress, update: DifUpdate) {
        if let Err(error) = self.apply_incoming(address, &update) {
            warn!(%address, kind = ?update.data.kind(), %error, "dropping undeliverable update");
        }
    }

    fn apply_incoming(self: &Arc<Self>, address: PointerAddress, update: &DifUpdate) -> SyncResult<()> {
        if update.source == self.config.actor {
            // Already applied locally when it was forwarded.
            debug!(%address, "skipping self-originated update echo");
            return Ok(());
        }

        let (mirror, meta, binding) = {
            let mirrors = self.mirrors.read();
            let slot = mirrors
                .get(&address)
                .ok_or(SyncError::UnknownTypeBinding { address })?;
            let mirror = slot
                .mirror
                .upgrade()
                .ok_or(SyncError::UnknownTypeBinding { address })?;
            (mirror, Arc::clone(&slot.meta), Arc::clone(&slot.binding))
        };

        // Embedded keys and values resolve to host values before dispatch.
        match &update.data {
            DifUpdateData::Replace(container) => {
                let value = self.resolve_container(container.clone())?.expect_ready()?;
                let _guard = meta.enter_remote();
                binding.handle_replace(&mirror, value)
            }
            DifUpdateData::Push(container) => {
                let value = self.resolve_container(container.clone())?.expect_ready()?;
                let _guard = meta.enter_remote();
                binding.handle_push(&mirror, value)
            }
            DifUpdateData::Set(key, container) => {
                let key = self.resolve_property(key)?;
                let value = self.resolve_container(container.clone())?.expect_ready()?;
                let _guard = meta.enter_remote();
                binding.handle_set(&mirror, key, value)
            }
            DifUpdateData::Remove(key) => {
                let key = self.resolve_property(key)?;
                let _guard = meta.enter_remote();
                binding.handle_remove(&mirror, key)
            }
            DifUpdateData::Clear => {
                let _guard = meta.enter_remote();
                binding.handle_clear(&mirror)
            }
        }
    }

    fn resolve_property(self: &Arc<Self>, property: &DifProperty) -> SyncResult<HostProperty> {
        match property {
            DifProperty::Text(text) => Ok(HostProperty::Text(text.clone())),
            DifProperty::Index(index) => Ok(HostProperty::Index(*index)),
            DifProperty::Value(container) => Ok(HostProperty::Value(
                self.resolve_container(container.clone())?.expect_ready()?,
            )),
        }
    }

    /// Materializes a resolved pointer payload into a live mirror.
    fn materialize_pointer(
        self: &Arc<Self>,
        address: PointerAddress,
        container: DifValueContainer,
    ) -> SyncResult<Resolution<HostValue>> {
        // A second resolution may have materialized while this one was
        // pending; the first mirror wins.
        if let Some(mirror) = self.cached_mirror(address) {
            return Ok(Resolution::Ready(mirror));
        }

        let payload = match container {
            DifValueContainer::Inline(value) => value,
            DifValueContainer::Address(_) => {
                return Err(SyncError::engine(
                    "pointer resolution yielded another pointer",
                ))
            }
        };

        let mutability = self.mutability_of(address, &payload);
        let registered = payload
            .type_address()
            .and_then(|type_address| self.registry.lookup(type_address));
        let handler = Arc::clone(self);

        match registered {
            Some(binding) => {
                let resolution = self.resolve_repr(payload.value)?;
                Ok(resolution.and_then(move |plain| {
                    let bound = binding.bind(&handler, plain, Some(address))?;
                    handler.install_mirror(address, &bound, binding, mutability)?;
                    Ok(bound.value)
                }))
            }
            None => {
                // No binding for the payload type: wrap the resolved
                // value in a scalar reference.
                let resolution = self.resolve_dif_value(payload)?;
                Ok(resolution.and_then(move |plain| {
                    let binding: Arc<dyn TypeBinding> = Arc::new(RefBinding::new(mutability));
                    let bound = binding.bind(&handler, plain, Some(address))?;
                    handler.install_mirror(address, &bound, binding, mutability)?;
                    Ok(bound.value)
                }))
            }
        }
    }

    fn install_mirror(
        self: &Arc<Self>,
        address: PointerAddress,
        bound: &BoundValue,
        binding: Arc<dyn TypeBinding>,
        mutability: Mutability,
    ) -> SyncResult<()> {
        self.mutabilities.write().insert(address, mutability);

        let Some(mirror) = WeakMirror::downgrade(&bound.value) else {
            debug!(%address, "binding produced a non-mirror value; identity not tracked");
            return Ok(());
        };

        // Immutable references receive no updates, so nothing observes.
        let engine_observer = if mutability == Mutability::Immutable {
            None
        } else {
            let weak_handler = Arc::downgrade(self);
            let observer: UpdateObserver = Box::new(move |addr, update| {
                if let Some(handler) = weak_handler.upgrade() {
                    handler.deliver_update(addr, update);
                }
            });
            Some(self.engine.observe_pointer(address, observer)?)
        };

        self.mirrors.write().insert(
            address,
            MirrorSlot {
                mirror,
                meta: Arc::clone(&bound.meta),
                binding,
                engine_observer,
            },
        );
        Ok(())
    }

    fn mutability_of(&self, address: PointerAddress, payload: &DifValue) -> Mutability {
        if let Some(known) = self.mutabilities.read().get(&address) {
            return *known;
        }
        if let Some(DifTypeContainer::Inline(descriptor)) = &payload.ty {
            if let Some(mutability) = descriptor.mutability {
                return mutability;
            }
        }
        Mutability::Mutable
    }

    fn cached_mirror(&self, address: PointerAddress) -> Option<HostValue> {
        self.mirrors
            .read()
            .get(&address)
            .and_then(|slot| slot.mirror.upgrade())
    }

    /// Drops dead mirror slots and releases their engine observers.
    fn prune_mirrors(&self) {
        let mut dead = Vec::new();
        {
            let mut mirrors = self.mirrors.write();
            mirrors.retain(|address, slot| {
                if slot.mirror.upgrade().is_some() {
                    true
                } else {
                    if let Some(engine_id) = slot.engine_observer {
                        dead.push((*address, engine_id));
                    }
                    false
                }
            });
        }
        for (address, engine_id) in dead {
            if let Err(error) = self.engine.unobserve_pointer(address, engine_id) {
                debug!(%address, %error, "failed to release observer of a dead mirror");
            }
        }
    }
}
