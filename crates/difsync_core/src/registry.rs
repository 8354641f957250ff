//! The type-binding registry.

use crate::binding::TypeBinding;
use difsync_value::PointerAddress;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A registry mapping type addresses to bindings.
///
/// The registry is populated at initialization, one entry per bound type,
/// and never shrinks; it holds binding definitions only, never mirrors.
/// Absence of an entry is not an error at this level; the caller decides
/// whether an unresolved type is fatal.
#[derive(Default)]
pub struct TypeRegistry {
    bindings: RwLock<HashMap<PointerAddress, Arc<dyn TypeBinding>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding for a type address.
    ///
    /// Re-registering an address replaces the previous binding.
    pub fn register(&self, address: PointerAddress, binding: Arc<dyn TypeBinding>) {
        if self.bindings.write().insert(address, binding).is_some() {
            debug!(%address, "replaced existing type binding");
        }
    }

    /// Looks up the binding for a type address.
    #[must_use]
    pub fn lookup(&self, address: PointerAddress) -> Option<Arc<dyn TypeBinding>> {
        self.bindings.read().get(&address).cloned()
    }

    /// Returns true when a binding is registered for the address.
    #[must_use]
    pub fn is_registered(&self, address: PointerAddress) -> bool {
        self.bindings.read().contains_key(&address)
    }

    /// Returns the number of registered bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Returns true when no bindings are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}
