//! Process-lifetime cache of decoded resources.
//!
//! Keyed by `(canonical URL, format)`, best-effort, unbounded: entries stay
//! until [`ResourceCache::clear`]. The cache is an explicitly constructed
//! object owned by the [`Loader`](crate::Loader) — created at startup,
//! cleared on demand, dropped with its owner — rather than module-level
//! global state.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::format::{Format, Value};

/// Map from `(canonical URL, format)` to decoded value.
#[derive(Default)]
pub struct ResourceCache {
    entries: RwLock<FxHashMap<(String, Format), Value>>,
}

impl ResourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached value, handing back a clone that shares storage
    /// with the cached object.
    pub fn get(&self, url: &str, format: &Format) -> Option<Value> {
        self.entries
            .read()
            .get(&(url.to_string(), format.clone()))
            .cloned()
    }

    /// Store a value. Values that veto retention are skipped silently;
    /// returns whether the value was actually stored.
    pub fn insert(&self, url: impl Into<String>, format: Format, value: Value) -> bool {
        if !value.cacheable() {
            return false;
        }
        self.entries.write().insert((url.into(), format), value);
        true
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::Arc;

    #[test]
    fn hits_share_storage_with_the_cached_object() {
        let cache = ResourceCache::new();
        let value = Value::Text(Arc::from("shared"));
        assert!(cache.insert("pkg:a.txt", Format::Text, value.clone()));

        let hit = cache.get("pkg:a.txt", &Format::Text).unwrap();
        assert!(hit.ptr_eq(&value));
    }

    #[test]
    fn keyed_by_url_and_format() {
        let cache = ResourceCache::new();
        cache.insert("pkg:a.txt", Format::Text, Value::Text(Arc::from("t")));

        assert!(cache.get("pkg:a.txt", &Format::Raw).is_none());
        assert!(cache.get("pkg:b.txt", &Format::Text).is_none());
        assert!(cache.get("pkg:a.txt", &Format::Text).is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let cache = ResourceCache::new();
        cache.insert("pkg:a.txt", Format::Text, Value::Text(Arc::from("t")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("pkg:a.txt", &Format::Text).is_none());
    }

    #[derive(Debug)]
    struct Uncacheable;

    impl crate::format::ExternalValue for Uncacheable {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn cacheable(&self) -> bool {
            false
        }
    }

    #[test]
    fn uncacheable_values_are_skipped_not_errors() {
        let cache = ResourceCache::new();
        let stored = cache.insert(
            "pkg:model",
            Format::External("model".into()),
            Value::External(Arc::new(Uncacheable)),
        );
        assert!(!stored);
        assert!(cache.is_empty());
    }
}
