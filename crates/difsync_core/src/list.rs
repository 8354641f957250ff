//! The mutation-intercepting sequence mirror.

use crate::binding::{BindingMeta, BoundValue, HostProperty, TypeBinding};
use crate::error::{SyncError, SyncResult};
use crate::handler::DifHandler;
use crate::host::HostValue;
use difsync_value::{DifProperty, DifUpdateData, DifValueContainer, PointerAddress};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A bound, mutation-intercepting sequence.
///
/// Every locally-invoked mutating operation runs a two-step protocol:
/// the operation is forwarded as an outgoing update first, built from the
/// pre-mutation state, and only then applied to the underlying storage.
/// Remote-origin updates are applied through the `apply_*` entry points,
/// which write to storage directly and never forward.
pub struct SyncedList {
    handler: Arc<DifHandler>,
    address: Option<PointerAddress>,
    meta: Arc<BindingMeta>,
    items: RwLock<Vec<HostValue>>,
}

impl SyncedList {
    pub(crate) fn from_parts(
        handler: Arc<DifHandler>,
        address: Option<PointerAddress>,
        items: Vec<HostValue>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler,
            address,
            meta: Arc::new(BindingMeta::new()),
            items: RwLock::new(items),
        })
    }

    /// Creates an empty mirror with no address.
    ///
    /// Detached mirrors intercept mutations but have nowhere to forward
    /// them; they become live once bound through pointer resolution.
    #[must_use]
    pub fn detached(handler: &Arc<DifHandler>) -> Arc<Self> {
        Self::from_parts(Arc::clone(handler), None, Vec::new())
    }

    /// Returns the pointer address this mirror is bound to, if any.
    #[must_use]
    pub fn address(&self) -> Option<PointerAddress> {
        self.address
    }

    /// Returns the mirror's opaque metadata.
    #[must_use]
    pub fn metadata(&self) -> Arc<BindingMeta> {
        Arc::clone(&self.meta)
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true when the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns the element at an index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<HostValue> {
        self.items.read().get(index).cloned()
    }

    /// Returns a snapshot of the whole sequence.
    #[must_use]
    pub fn to_vec(&self) -> Vec<HostValue> {
        self.items.read().clone()
    }

    fn forward(&self, data: DifUpdateData) -> SyncResult<()> {
        // Accesses from inside the binding's own update application must
        // not re-forward.
        if self.meta.in_remote_apply() {
            return Ok(());
        }
        match self.address {
            Some(address) => self.handler.forward_update(address, data),
            None => Ok(()),
        }
    }

    fn null_container(&self) -> SyncResult<DifValueContainer> {
        self.handler.convert_to_container(&HostValue::Null)
    }

    /// Appends an element.
    pub fn push(&self, value: HostValue) -> SyncResult<()> {
        let container = self.handler.convert_to_container(&value)?;
        self.forward(DifUpdateData::Push(container))?;
        self.items.write().push(value);
        Ok(())
    }

    /// Appends every element, preserving call order.
    pub fn extend(&self, values: impl IntoIterator<Item = HostValue>) -> SyncResult<()> {
        for value in values {
            self.push(value)?;
        }
        Ok(())
    }

    /// Assigns the element at an index.
    ///
    /// Assigning beyond the current length grows the sequence: every newly
    /// created slot below the assigned index is reported as a set-to-null
    /// and filled with a null placeholder.
    pub fn set(&self, index: usize, value: HostValue) -> SyncResult<()> {
        let container = self.handler.convert_to_container(&value)?;
        let len = self.items.read().len();

        for fill in len..index {
            let null = self.null_container()?;
            self.forward(DifUpdateData::Set(DifProperty::Index(fill as u64), null))?;
        }
        self.forward(DifUpdateData::Set(
            DifProperty::Index(index as u64),
            container,
        ))?;

        let mut items = self.items.write();
        if index >= items.len() {
            items.resize(index + 1, HostValue::Null);
        }
        items[index] = value;
        Ok(())
    }

    /// Changes the length of the sequence.
    ///
    /// Shrinking reports one remove per discarded trailing index, highest
    /// first so replay with shifting removals lands on the intended slots.
    /// Growing reports a set-to-null per new index.
    pub fn set_len(&self, new_len: usize) -> SyncResult<()> {
        let len = self.items.read().len();
        if new_len < len {
            for index in (new_len..len).rev() {
                self.forward(DifUpdateData::Remove(DifProperty::Index(index as u64)))?;
            }
            self.items.write().truncate(new_len);
        } else if new_len > len {
            for index in len..new_len {
                let null = self.null_container()?;
                self.forward(DifUpdateData::Set(DifProperty::Index(index as u64), null))?;
            }
            self.items.write().resize(new_len, HostValue::Null);
        }
        Ok(())
    }

    /// Removes the element at an index, shifting the rest down.
    pub fn remove(&self, index: usize) -> SyncResult<Option<HostValue>> {
        if index >= self.items.read().len() {
            return Ok(None);
        }
        self.forward(DifUpdateData::Remove(DifProperty::Index(index as u64)))?;
        let mut items = self.items.write();
        if index < items.len() {
            Ok(Some(items.remove(index)))
        } else {
            Ok(None)
        }
    }

    /// Removes every element.
    pub fn clear(&self) -> SyncResult<()> {
        self.forward(DifUpdateData::Clear)?;
        self.items.write().clear();
        Ok(())
    }

    // Remote-origin application. These write directly; the caller holds
    // the mirror's remote-apply guard.

    pub(crate) fn apply_push(&self, value: HostValue) {
        self.items.write().push(value);
    }

    pub(crate) fn apply_set(&self, index: u64, value: HostValue) {
        let index = index as usize;
        let mut items = self.items.write();
        if index >= items.len() {
            items.resize(index + 1, HostValue::Null);
        }
        items[index] = value;
    }

    pub(crate) fn apply_remove(&self, index: u64) {
        let index = index as usize;
        let mut items = self.items.write();
        if index < items.len() {
            items.remove(index);
        }
    }

    pub(crate) fn apply_clear(&self) {
        self.items.write().clear();
    }

    pub(crate) fn apply_replace(&self, values: Vec<HostValue>) {
        let mut items = self.items.write();
        items.clear();
        items.extend(values);
    }
}

impl fmt::Debug for SyncedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedList")
            .field("address", &self.address)
            .field("len", &self.len())
            .finish()
    }
}

/// The built-in binding for the sequence type.
pub(crate) struct ListBinding;

impl ListBinding {
    fn mirror<'a>(&self, mirror: &'a HostValue) -> SyncResult<&'a Arc<SyncedList>> {
        mirror.as_synced_list().ok_or_else(|| {
            SyncError::invalid_update_key("list mirror", mirror.shape_name())
        })
    }

    fn index(&self, key: &HostProperty) -> SyncResult<u64> {
        key.as_index()
            .ok_or_else(|| SyncError::invalid_update_key("index key", key.kind_name()))
    }
}

impl TypeBinding for ListBinding {
    fn bind(
        &self,
        handler: &Arc<DifHandler>,
        payload: HostValue,
        address: Option<PointerAddress>,
    ) -> SyncResult<BoundValue> {
        let items = match payload {
            HostValue::List(items) => items,
            other => {
                return Err(SyncError::invalid_update_key(
                    "sequence payload",
                    other.shape_name(),
                ))
            }
        };
        let list = SyncedList::from_parts(Arc::clone(handler), address, items);
        let meta = list.metadata();
        Ok(BoundValue {
            value: HostValue::SyncedList(list),
            meta,
        })
    }

    fn handle_replace(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        let list = self.mirror(mirror)?;
        match value {
            HostValue::List(values) => {
                list.apply_replace(values);
                Ok(())
            }
            other => Err(SyncError::invalid_update_key(
                "sequence payload",
                other.shape_name(),
            )),
        }
    }

    fn handle_push(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        self.mirror(mirror)?.apply_push(value);
        Ok(())
    }

    fn handle_set(
        &self,
        mirror: &HostValue,
        key: HostProperty,
        value: HostValue,
    ) -> SyncResult<()> {
        let list = self.mirror(mirror)?;
        let index = self.index(&key)?;
        list.apply_set(index, value);
        Ok(())
    }

    fn handle_remove(&self, mirror: &HostValue, key: HostProperty) -> SyncResult<()> {
        let list = self.mirror(mirror)?;
        let index = self.index(&key)?;
        list.apply_remove(index);
        Ok(())
    }

    fn handle_clear(&self, mirror: &HostValue) -> SyncResult<()> {
        self.mirror(mirror)?.apply_clear();
        Ok(())
    }
}
