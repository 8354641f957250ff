//! The mutation-intercepting keyed mirror.

use crate::binding::{BindingMeta, BoundValue, HostProperty, TypeBinding};
use crate::error::{SyncError, SyncResult};
use crate::handler::DifHandler;
use crate::host::HostValue;
use difsync_value::{DifProperty, DifUpdateData, PointerAddress};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A bound, mutation-intercepting keyed collection.
///
/// Entries are kept as a key/value list in insertion order; keys may be
/// arbitrary host values. Local mutations run the forward-then-apply
/// protocol; remote-origin updates apply directly to storage through the
/// `apply_*` entry points and are never re-forwarded.
pub struct SyncedMap {
    handler: Arc<DifHandler>,
    address: Option<PointerAddress>,
    meta: Arc<BindingMeta>,
    entries: RwLock<Vec<(HostValue, HostValue)>>,
}

impl SyncedMap {
    pub(crate) fn from_parts(
        handler: Arc<DifHandler>,
        address: Option<PointerAddress>,
        entries: Vec<(HostValue, HostValue)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler,
            address,
            meta: Arc::new(BindingMeta::new()),
            entries: RwLock::new(entries),
        })
    }

    /// Creates an empty mirror with no address.
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

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &HostValue) -> Option<HostValue> {
        self.entries
            .read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Returns true when the collection contains a key.
    #[must_use]
    pub fn contains_key(&self, key: &HostValue) -> bool {
        self.entries.read().iter().any(|(k, _)| k == key)
    }

    /// Returns a snapshot of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<(HostValue, HostValue)> {
        self.entries.read().clone()
    }

    fn forward(&self, data: DifUpdateData) -> SyncResult<()> {
        if self.meta.in_remote_apply() {
            return Ok(());
        }
        match self.address {
            Some(address) => self.handler.forward_update(address, data),
            None => Ok(()),
        }
    }

    fn key_property(&self, key: &HostValue) -> SyncResult<DifProperty> {
        match key {
            HostValue::Text(text) => Ok(DifProperty::Text(text.clone())),
            other => Ok(DifProperty::Value(
                self.handler.convert_to_container(other)?,
            )),
        }
    }

    /// Sets the value for a key, inserting or replacing the entry.
    pub fn set(&self, key: HostValue, value: HostValue) -> SyncResult<()> {
        let property = self.key_property(&key)?;
        let container = self.handler.convert_to_container(&value)?;
        self.forward(DifUpdateData::Set(property, container))?;
        self.store(key, value);
        Ok(())
    }

    /// Removes the entry for a key.
    pub fn remove(&self, key: &HostValue) -> SyncResult<Option<HostValue>> {
        if !self.contains_key(key) {
            return Ok(None);
        }
        let property = self.key_property(key)?;
        self.forward(DifUpdateData::Remove(property))?;
        Ok(self.erase(key))
    }

    /// Removes every entry.
    pub fn clear(&self) -> SyncResult<()> {
        self.forward(DifUpdateData::Clear)?;
        self.entries.write().clear();
        Ok(())
    }

    fn store(&self, key: HostValue, value: HostValue) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    fn erase(&self, key: &HostValue) -> Option<HostValue> {
        let mut entries = self.entries.write();
        let position = entries.iter().position(|(k, _)| k == key)?;
        Some(entries.remove(position).1)
    }

    // Remote-origin application.

    pub(crate) fn apply_set(&self, key: HostValue, value: HostValue) {
        self.store(key, value);
    }

    pub(crate) fn apply_remove(&self, key: &HostValue) {
        self.erase(key);
    }

    pub(crate) fn apply_clear(&self) {
        self.entries.write().clear();
    }

    /// Replace policy: clear, then repopulate from the replacement.
    pub(crate) fn apply_replace(&self, replacement: Vec<(HostValue, HostValue)>) {
        let mut entries = self.entries.write();
        entries.clear();
        for (key, value) in replacement {
            entries.push((key, value));
        }
    }
}

impl fmt::Debug for SyncedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedMap")
            .field("address", &self.address)
            .field("len", &self.len())
            .finish()
    }
}

/// The built-in binding for the keyed collection type.
pub(crate) struct MapBinding;

impl MapBinding {
    fn mirror<'a>(&self, mirror: &'a HostValue) -> SyncResult<&'a Arc<SyncedMap>> {
        mirror
            .as_synced_map()
            .ok_or_else(|| SyncError::invalid_update_key("map mirror", mirror.shape_name()))
    }
}

impl TypeBinding for MapBinding {
    fn bind(
        &self,
        handler: &Arc<DifHandler>,
        payload: HostValue,
        address: Option<PointerAddress>,
    ) -> SyncResult<BoundValue> {
        let entries = match payload {
            HostValue::Dictionary(entries) => entries,
            other => {
                return Err(SyncError::invalid_update_key(
                    "mapping payload",
                    other.shape_name(),
                ))
            }
        };
        let map = SyncedMap::from_parts(Arc::clone(handler), address, entries);
        let meta = map.metadata();
        Ok(BoundValue {
            value: HostValue::SyncedMap(map),
            meta,
        })
    }

    fn handle_replace(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        let map = self.mirror(mirror)?;
        match value {
            HostValue::Dictionary(entries) => {
                map.apply_replace(entries);
                Ok(())
            }
            other => Err(SyncError::invalid_update_key(
                "mapping payload",
                other.shape_name(),
            )),
        }
    }

    fn handle_set(
        &self,
        mirror: &HostValue,
        key: HostProperty,
        value: HostValue,
    ) -> SyncResult<()> {
        let map = self.mirror(mirror)?;
        map.apply_set(key.into_host_value(), value);
        Ok(())
    }

    fn handle_remove(&self, mirror: &HostValue, key: HostProperty) -> SyncResult<()> {
        let map = self.mirror(mirror)?;
        map.apply_remove(&key.into_host_value());
        Ok(())
    }

    fn handle_clear(&self, mirror: &HostValue) -> SyncResult<()> {
        self.mirror(mirror)?.apply_clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::engine::{MockEngine, RuntimeEngine};
    use difsync_value::{core_types, DifRepr, DifUpdate, DifValue, DifValueContainer};

    fn bound_map(entries: &[(&str, &str)]) -> (Arc<MockEngine>, Arc<DifHandler>, Arc<SyncedMap>) {
        let engine = Arc::new(MockEngine::new());
        let handler = DifHandler::new(
            Arc::clone(&engine) as Arc<dyn RuntimeEngine>,
            HandlerConfig::new("@local"),
        );
        let address = engine.mint_address();
        engine.set_pointer(
            address,
            DifValueContainer::Inline(DifValue::typed(
                core_types::MAP,
                DifRepr::Mapping(
                    entries
                        .iter()
                        .map(|(key, value)| {
                            (
                                DifValueContainer::Inline(DifValue::text(*key)),
                                DifValueContainer::Inline(DifValue::text(*value)),
                            )
                        })
                        .collect(),
                ),
            )),
        );
        let mirror = handler
            .resolve_address(address)
            .unwrap()
            .expect_ready()
            .unwrap();
        let map = Arc::clone(mirror.as_synced_map().unwrap());
        (engine, handler, map)
    }

    fn key(text: &str) -> HostValue {
        HostValue::Text(text.into())
    }

    #[test]
    fn local_set_forwards_then_applies() {
        let (engine, _handler, map) = bound_map(&[]);

        map.set(key("k"), HostValue::Decimal(1.0)).unwrap();
        assert_eq!(map.get(&key("k")), Some(HostValue::Decimal(1.0)));

        let updates = engine.updates_for(map.address().unwrap());
        assert_eq!(updates.len(), 1);
        match &updates[0].data {
            DifUpdateData::Set(DifProperty::Text(k), _) => assert_eq!(k, "k"),
            other => panic!("expected set, got {other:?}"),
        }
    }

    #[test]
    fn local_set_replaces_existing_entry() {
        let (_engine, _handler, map) = bound_map(&[("k", "old")]);

        map.set(key("k"), HostValue::Text("new".into())).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&key("k")), Some(HostValue::Text("new".into())));
    }

    #[test]
    fn local_remove_forwards_then_applies() {
        let (engine, _handler, map) = bound_map(&[("k", "v")]);

        let removed = map.remove(&key("k")).unwrap();
        assert_eq!(removed, Some(HostValue::Text("v".into())));
        assert!(!map.contains_key(&key("k")));

        let updates = engine.updates_for(map.address().unwrap());
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0].data, DifUpdateData::Remove(_)));
    }

    #[test]
    fn removing_a_missing_key_forwards_nothing() {
        let (engine, _handler, map) = bound_map(&[]);
        assert_eq!(map.remove(&key("missing")).unwrap(), None);
        assert!(engine.recorded_updates().is_empty());
    }

    #[test]
    fn clear_is_terminal() {
        let (engine, _handler, map) = bound_map(&[("a", "1"), ("b", "2")]);

        map.clear().unwrap();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());

        let updates = engine.updates_for(map.address().unwrap());
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0].data, DifUpdateData::Clear));
    }

    #[test]
    fn non_text_keys_are_supported() {
        let (_engine, _handler, map) = bound_map(&[]);

        map.set(HostValue::Decimal(1.0), HostValue::Text("one".into()))
            .unwrap();
        assert_eq!(
            map.get(&HostValue::Decimal(1.0)),
            Some(HostValue::Text("one".into()))
        );
    }

    #[test]
    fn remote_delete_applies_without_reforwarding() {
        let (engine, handler, map) = bound_map(&[("key1", "v1"), ("key2", "v2")]);
        let address = map.address().unwrap();

        handler.deliver_update(
            address,
            DifUpdate::remove("@remote", DifProperty::Text("key1".into())),
        );

        assert!(!map.contains_key(&key("key1")));
        assert!(map.contains_key(&key("key2")));
        assert!(engine.updates_for(address).is_empty());
    }

    #[test]
    fn remote_set_applies_directly() {
        let (engine, handler, map) = bound_map(&[]);
        let address = map.address().unwrap();

        handler.deliver_update(
            address,
            DifUpdate::set(
                "@remote",
                DifProperty::Text("k".into()),
                DifValueContainer::Inline(DifValue::text("v")),
            ),
        );
        assert_eq!(map.get(&key("k")), Some(HostValue::Text("v".into())));
        assert!(engine.updates_for(address).is_empty());
    }

    #[test]
    fn remote_clear_empties_the_mirror() {
        let (_engine, handler, map) = bound_map(&[("a", "1"), ("b", "2"), ("c", "3")]);
        handler.deliver_update(map.address().unwrap(), DifUpdate::clear("@remote"));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn remote_replace_clears_then_repopulates() {
        let (_engine, handler, map) = bound_map(&[("old", "gone")]);
        let address = map.address().unwrap();

        let replacement = DifValue::typed(
            core_types::MAP,
            DifRepr::Mapping(vec![(
                DifValueContainer::Inline(DifValue::text("new")),
                DifValueContainer::Inline(DifValue::text("here")),
            )]),
        );
        handler.deliver_update(
            address,
            DifUpdate::replace("@remote", DifValueContainer::Inline(replacement)),
        );

        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&key("old")));
        assert_eq!(map.get(&key("new")), Some(HostValue::Text("here".into())));
    }

    #[test]
    fn remote_push_is_ignored_by_the_map_binding() {
        let (_engine, handler, map) = bound_map(&[("a", "1")]);

        // Maps do not opt into push; the update is a no-op.
        handler.deliver_update(
            map.address().unwrap(),
            DifUpdate::push("@remote", DifValueContainer::Inline(DifValue::text("x"))),
        );
        assert_eq!(map.len(), 1);
    }
}
