//! Type bindings: per-type mirror construction and update application.

use crate::error::SyncResult;
use crate::handler::DifHandler;
use crate::host::HostValue;
use difsync_value::PointerAddress;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Opaque per-mirror metadata.
///
/// A mirror's metadata recognizes accesses that originate from inside the
/// binding's own update-application code: while a remote-origin update is
/// being applied, the interception path must not forward the resulting
/// storage mutations back out, or every rebroadcast would echo forever.
#[derive(Debug, Default)]
pub struct BindingMeta {
    remote_depth: AtomicU32,
}

impl BindingMeta {
    /// Creates fresh metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a remote-origin update is being applied.
    #[must_use]
    pub fn in_remote_apply(&self) -> bool {
        self.remote_depth.load(Ordering::SeqCst) > 0
    }

    /// Marks the start of a remote-origin application.
    ///
    /// The returned guard re-enables forwarding when dropped. Nested
    /// applications are counted, so re-entrant handlers stay suppressed.
    pub(crate) fn enter_remote(&self) -> RemoteApplyGuard<'_> {
        self.remote_depth.fetch_add(1, Ordering::SeqCst);
        RemoteApplyGuard { meta: self }
    }
}

/// Guard marking an in-progress remote-origin application.
pub(crate) struct RemoteApplyGuard<'a> {
    meta: &'a BindingMeta,
}

impl Drop for RemoteApplyGuard<'_> {
    fn drop(&mut self) {
        self.meta.remote_depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A key within an update, resolved to host values.
#[derive(Debug, Clone, PartialEq)]
pub enum HostProperty {
    /// A text key.
    Text(String),
    /// An index key.
    Index(u64),
    /// An arbitrary value key.
    Value(HostValue),
}

impl HostProperty {
    /// Returns the index, if this is an index key.
    #[must_use]
    pub fn as_index(&self) -> Option<u64> {
        match self {
            Self::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// Returns the text, if this is a text key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// A short name for the key's kind, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text key",
            Self::Index(_) => "index key",
            Self::Value(_) => "value key",
        }
    }

    /// Converts this property into a plain host value key.
    #[must_use]
    pub fn into_host_value(self) -> HostValue {
        match self {
            Self::Text(text) => HostValue::Text(text),
            Self::Index(index) => HostValue::Decimal(index as f64),
            Self::Value(value) => value,
        }
    }
}

/// A freshly bound mirror together with its metadata.
pub struct BoundValue {
    /// The live, mutation-intercepting mirror.
    pub value: HostValue,
    /// The mirror's opaque metadata.
    pub meta: Arc<BindingMeta>,
}

/// Per-type synchronization behavior.
///
/// A binding constructs a live mirror from a resolved payload and applies
/// remote-origin updates to it. The update handlers default to no-ops:
/// bindings opt in per operation kind, and an update of a kind the binding
/// did not opt into is silently ignored.
pub trait TypeBinding: Send + Sync {
    /// Constructs a live mirror from a resolved payload.
    ///
    /// Invoked once per address, the first time a pointer of this type is
    /// resolved locally. `address` is `None` when the value was inline
    /// (such a mirror intercepts mutations but has nowhere to forward).
    fn bind(
        &self,
        handler: &Arc<DifHandler>,
        payload: HostValue,
        address: Option<PointerAddress>,
    ) -> SyncResult<BoundValue>;

    /// Applies a remote replace to the mirror.
    fn handle_replace(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        let _ = (mirror, value);
        debug!("replace update ignored: binding does not handle replace");
        Ok(())
    }

    /// Applies a remote push to the mirror.
    fn handle_push(&self, mirror: &HostValue, value: HostValue) -> SyncResult<()> {
        let _ = (mirror, value);
        debug!("push update ignored: binding does not handle push");
        Ok(())
    }

    /// Applies a remote set to the mirror.
    fn handle_set(
        &self,
        mirror: &HostValue,
        key: HostProperty,
        value: HostValue,
    ) -> SyncResult<()> {
        let _ = (mirror, key, value);
        debug!("set update ignored: binding does not handle set");
        Ok(())
    }

    /// Applies a remote remove to the mirror.
    fn handle_remove(&self, mirror: &HostValue, key: HostProperty) -> SyncResult<()> {
        let _ = (mirror, key);
        debug!("remove update ignored: binding does not handle remove");
        Ok(())
    }

    /// Applies a remote clear to the mirror.
    fn handle_clear(&self, mirror: &HostValue) -> SyncResult<()> {
        let _ = mirror;
        debug!("clear update ignored: binding does not handle clear");
        Ok(())
    }
}
