//! Lazily loaded resources.
//!
//! [`LazyResource`] defers a [`Loader::load`] until the value is first
//! needed. The wrapper keeps its own identity: it holds the loaded value in
//! a cell and forwards to it, rather than replacing itself with the loaded
//! object.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::format::Value;
use crate::loader::Loader;

/// A resource that is loaded on first access.
pub struct LazyResource {
    loader: Arc<Loader>,
    url: String,
    cell: OnceLock<Value>,
}

impl LazyResource {
    /// Wrap `url`, to be loaded through `loader` when first accessed.
    pub fn new(loader: Arc<Loader>, url: impl Into<String>) -> Self {
        Self {
            loader,
            url: url.into(),
            cell: OnceLock::new(),
        }
    }

    /// The resource URL this wrapper will load.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the value has been loaded yet.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The loaded value, loading it on first call.
    ///
    /// A failed load leaves the cell empty, so a later call tries again.
    /// Racing initializers may both load; the first stored value wins and
    /// is what every caller sees.
    pub fn get(&self) -> Result<&Value> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = self.loader.load(&self.url)?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl fmt::Debug for LazyResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyResource")
            .field("url", &self.url)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_on_first_access_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("lazy.txt"), "deferred").unwrap();

        let loader = Arc::new(Loader::with_roots([dir
            .path()
            .to_string_lossy()
            .into_owned()]));
        let lazy = LazyResource::new(loader, "pkg:lazy.txt");
        assert!(!lazy.is_loaded());

        let first = lazy.get().unwrap().clone();
        assert!(lazy.is_loaded());
        assert_eq!(first.as_text(), Some("deferred"));

        // Second access hands back the same shared value.
        let second = lazy.get().unwrap();
        assert!(first.ptr_eq(second));
    }

    #[test]
    fn failed_load_retries_on_next_access() {
        let dir = TempDir::new().unwrap();
        let loader = Arc::new(Loader::with_roots([dir
            .path()
            .to_string_lossy()
            .into_owned()]));
        let lazy = LazyResource::new(loader, "pkg:late.txt");

        assert!(lazy.get().is_err());
        assert!(!lazy.is_loaded());

        std::fs::write(dir.path().join("late.txt"), "arrived").unwrap();
        assert_eq!(lazy.get().unwrap().as_text(), Some("arrived"));
    }
}
