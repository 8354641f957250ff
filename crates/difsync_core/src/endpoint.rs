//! Endpoint identities and the process-wide identity cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// An endpoint-like identity, canonically named by a string.
///
/// Endpoints are shared: resolving the same name twice while an instance
/// is alive yields the same `Arc`, so identity comparisons can be made by
/// pointer as well as by name.
#[derive(Debug, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
}

impl Endpoint {
    fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A cache mapping canonical names to weakly-held endpoint instances.
///
/// The cache never keeps an otherwise-unreferenced instance alive: entries
/// hold weak references, and dead entries are pruned as they are
/// encountered. Correctness depends only on "same live name → same
/// instance", not on eager collection timing.
#[derive(Default)]
pub struct EndpointCache {
    entries: RwLock<HashMap<String, Weak<Endpoint>>>,
}

impl EndpointCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a name to its canonical shared instance.
    ///
    /// Returns the live instance when one exists, otherwise constructs
    /// and registers a new one.
    pub fn resolve(&self, name: &str) -> Arc<Endpoint> {
        if let Some(existing) = self.entries.read().get(name).and_then(Weak::upgrade) {
            return existing;
        }

        let mut entries = self.entries.write();
        // Racing resolvers may have registered between the locks.
        if let Some(existing) = entries.get(name).and_then(Weak::upgrade) {
            return existing;
        }
        let endpoint = Arc::new(Endpoint::new(name));
        entries.insert(name.to_string(), Arc::downgrade(&endpoint));
        endpoint
    }

    /// Removes entries whose instance has been released.
    pub fn prune(&self) {
        self.entries
            .write()
            .retain(|_, weak| weak.strong_count() > 0);
    }

    /// Returns the number of cached entries, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_yields_same_instance() {
        let cache = EndpointCache::new();
        let a = cache.resolve("@alice");
        let b = cache.resolve("@alice");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_names_yield_different_instances() {
        let cache = EndpointCache::new();
        let a = cache.resolve("@alice");
        let b = cache.resolve("@bob");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "@alice");
        assert_eq!(b.name(), "@bob");
    }

    #[test]
    fn cache_does_not_keep_instances_alive() {
        let cache = EndpointCache::new();
        let endpoint = cache.resolve("@carol");
        let weak = Arc::downgrade(&endpoint);
        drop(endpoint);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn released_name_may_be_reconstructed() {
        let cache = EndpointCache::new();
        let first = cache.resolve("@dave");
        drop(first);
        // A later resolution constructs a fresh instance.
        let second = cache.resolve("@dave");
        assert_eq!(second.name(), "@dave");
    }

    #[test]
    fn prune_drops_dead_entries() {
        let cache = EndpointCache::new();
        let keep = cache.resolve("@kept");
        drop(cache.resolve("@dead"));

        assert_eq!(cache.len(), 2);
        cache.prune();
        assert_eq!(cache.len(), 1);
        assert_eq!(keep.name(), "@kept");
    }
}
