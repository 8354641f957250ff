//! Scalar references.

use crate::binding::{BindingMeta, BoundValue, TypeBinding};
use crate::error::{SyncError, SyncResult};
use crate::handler::DifHandler;
use crate::host::HostValue;
use difsync_value::{DifUpdateData, Mutability, PointerAddress};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A single-value box over a pointer to a non-collection value.
///
/// Reading returns the cached local value without touching the remote
/// store. Writing forwards a replace update carrying the new value, then
/// replaces the cache; there is no finer-grained update kind for
/// scalars.
pub struct ScalarRef {
    handler: Arc<DifHandler>,
    address: PointerAddress,
    mutability: Mutability,
    meta: Arc<BindingMeta>,
    value: RwLock<HostValue>,
}

impl ScalarRef {
    pub(crate) fn from_parts(
        handler: Arc<DifHandler>,
        address: PointerAddress,
        mutability: Mutability,
        value: HostValue,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler,
            address,
            mutability,
            meta: Arc::new(BindingMeta::new()),
            value: RwLock::new(value),
        })
    }

    /// Returns the pointer address this reference is bound to.
    #[must_use]
    pub fn address(&self) -> PointerAddress {
        self.address
    }

    /// Returns the reference's mutability.
    #[must_use]
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Returns the mirror's opaque metadata.
    #[must_use]
    pub fn metadata(&self) -> Arc<BindingMeta> {
        Arc::clone(&self.meta)
    }

    /// Returns the cached value.
    #[must_use]
    pub fn get(&self) -> HostValue {
        self.value.read().clone()
    }

    /// Replaces the value.
    ///
    /// Forwards a replace update carrying the new value, then updates the
    /// cache. Fails on an immutable reference.
    pub fn set(&self, value: HostValue) -> SyncResult<()> {
        if self.mutability == Mutability::Immutable {
            return Err(SyncError::ImmutableReferenceViolation {
                address: self.address,
            });
        }
        if !self.meta.in_remote_apply() {
            let container = self.handler.convert_to_container(&value)?;
            self.handler
                .forward_update(self.address, DifUpdateData::Replace(container))?;
        }
        *self.value.write() = value;
        Ok(())
    }

    pub(crate) fn apply_replace(&self, value: HostValue) {
        *self.value.write() = value;
    }
}

impl fmt::Debug for ScalarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarRef")
            .field("address", &self.address)
            .field("mutability", &self.mutability)
            .finish()
    }
}

/// The fallback binding wrapping non-collection pointer payloads.
///
/// Not registered by address: the handler reaches for it whenever a
/// pointer's payload type has no registered binding of its own.
pub(crate) struct RefBinding {
    mutability: Mutability,
}

impl RefBinding {
    pub(crate) fn new(mutability: Mutability) -> Self {
        Self { mutability }
    }
}

impl TypeBinding for RefBinding {
    fn bind(
        &self,
        handler: &Arc<DifHandler>,
        payload: HostValue,
        address: Option<PointerAddress>,
    ) -> SyncResult<BoundValue> {
        let address = address.ok_or_else(|| {
            SyncError::unsupported_type("scalar references require a pointer address")
        })?;
        let reference =
            ScalarRef::from_parts(Arc::clone(handler), address, self.mutability, payload);
        let meta = reference.metadata();
        Ok(BoundValue {
            value: HostValue::Ref(reference),
            meta,
        })
    }

    fn handle_replace(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        let reference = mirror.as_ref_value().ok_or_else(|| {
            SyncError::invalid_update_key("scalar reference", mirror.shape_name())
        })?;
        reference.apply_replace(value);
        Ok(())
    }

    // Push, set, remove and clear stay unhandled: a scalar has no
    // finer-grained update kinds.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::engine::{MockEngine, RuntimeEngine};
    use crate::resolution::Resolution;
    use difsync_value::{core_types, DifRepr, DifUpdate, DifValue, DifValueContainer};

    fn bound_ref(
        value: DifValue,
        mutability: Mutability,
    ) -> (Arc<MockEngine>, Arc<DifHandler>, Arc<ScalarRef>) {
        let engine = Arc::new(MockEngine::new());
        let handler = DifHandler::new(
            Arc::clone(&engine) as Arc<dyn RuntimeEngine>,
            HandlerConfig::new("@local"),
        );
        let host = handler
            .resolve_dif_value(value)
            .unwrap()
            .expect_ready()
            .unwrap();
        let address = match handler.create_pointer(&host, None, mutability).unwrap() {
            Resolution::Ready(address) => address,
            Resolution::Pending(_) => panic!("mock engine answered pending"),
        };
        let mirror = handler
            .resolve_address(address)
            .unwrap()
            .expect_ready()
            .unwrap();
        let reference = Arc::clone(mirror.as_ref_value().unwrap());
        (engine, handler, reference)
    }

    #[test]
    fn get_returns_the_cached_value() {
        let (_engine, _handler, reference) = bound_ref(
            DifValue::typed(core_types::F64, DifRepr::Decimal(1.5)),
            Mutability::Mutable,
        );
        assert_eq!(reference.get(), HostValue::Decimal(1.5));
    }

    #[test]
    fn set_forwards_a_replace_then_caches() {
        let (engine, _handler, reference) = bound_ref(
            DifValue::text("before"),
            Mutability::Mutable,
        );
        engine.clear_recorded();

        reference.set(HostValue::Text("after".into())).unwrap();
        assert_eq!(reference.get(), HostValue::Text("after".into()));

        let updates = engine.updates_for(reference.address());
        assert_eq!(updates.len(), 1);
        match &updates[0].data {
            DifUpdateData::Replace(DifValueContainer::Inline(value)) => {
                assert_eq!(value.as_text(), Some("after"));
            }
            other => panic!("expected replace, got {other:?}"),
        }
    }

    #[test]
    fn immutable_reference_rejects_writes() {
        let (engine, _handler, reference) = bound_ref(
            DifValue::typed(core_types::BOOLEAN, DifRepr::Bool(true)),
            Mutability::Immutable,
        );
        engine.clear_recorded();

        assert!(matches!(
            reference.set(HostValue::Bool(false)),
            Err(SyncError::ImmutableReferenceViolation { .. })
        ));
        assert_eq!(reference.get(), HostValue::Bool(true));
        assert!(engine.recorded_updates().is_empty());
    }

    #[test]
    fn remote_replace_updates_the_cache_without_reforwarding() {
        let (engine, handler, reference) = bound_ref(
            DifValue::typed(core_types::F64, DifRepr::Decimal(1.0)),
            Mutability::Mutable,
        );
        engine.clear_recorded();

        handler.deliver_update(
            reference.address(),
            DifUpdate::replace(
                "@remote",
                DifValueContainer::Inline(DifValue::typed(
                    core_types::F64,
                    DifRepr::Decimal(2.0),
                )),
            ),
        );
        assert_eq!(reference.get(), HostValue::Decimal(2.0));
        assert!(engine.updates_for(reference.address()).is_empty());
    }

    #[test]
    fn remote_push_is_ignored_by_a_scalar_reference() {
        let (_engine, handler, reference) = bound_ref(
            DifValue::typed(core_types::F64, DifRepr::Decimal(1.0)),
            Mutability::Mutable,
        );

        // Scalars only handle replace; other kinds are no-ops.
        handler.deliver_update(
            reference.address(),
            DifUpdate::push("@remote", DifValueContainer::Inline(DifValue::text("x"))),
        );
        assert_eq!(reference.get(), HostValue::Decimal(1.0));
    }
}
