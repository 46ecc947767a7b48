//! Open-on-demand zip archive handles.
//!
//! A resolution pass over a large data package can touch dozens of archives.
//! Keeping every one of them open would exhaust file descriptors, so a
//! [`ZipHandle`] holds no descriptor at rest: construction opens the archive
//! once to record its entry table, then closes it, and each [`ZipHandle::read`]
//! reopens the file for the span of that single read. Existence checks run
//! against the recorded table and never touch the filesystem.
//!
//! Handles are read-only and shared: one handle per physical archive, handed
//! out as `Arc` from a process-wide table so every pointer into the same
//! archive reuses the same entry table and descriptor bookkeeping.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;
use zip::ZipArchive;

use crate::error::Result;

/// Name and stored uncompressed size of one archive entry.
#[derive(Debug, Clone)]
struct EntryMeta {
    name: String,
    size: u64,
}

/// A zip archive that opens its backing file only while reading.
#[derive(Debug)]
pub struct ZipHandle {
    path: PathBuf,
    /// Entry table from the central directory, sorted by name.
    entries: Vec<EntryMeta>,
    /// Serializes reads so at most one descriptor per handle is ever open.
    read_lock: Mutex<()>,
}

impl ZipHandle {
    /// Open `path` once to validate it and record its entry table, then
    /// close it again.
    pub fn new(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path)?;
        let file = File::open(&path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            entries.push(EntryMeta {
                name: entry.name().to_string(),
                size: entry.size(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!(archive = %path.display(), entries = entries.len(), "scanned archive");

        // `archive` drops here, closing the descriptor.
        Ok(Self {
            path,
            entries,
            read_lock: Mutex::new(()),
        })
    }

    /// Absolute path of the underlying archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the archive contains `entry` under exactly that name.
    pub fn contains(&self, entry: &str) -> bool {
        self.index_of(entry).is_some()
    }

    /// Whether any entry name starts with `prefix`.
    ///
    /// Directories are often not listed explicitly in an archive, so a
    /// directory "exists" when some entry lives under it.
    pub fn contains_prefix(&self, prefix: &str) -> bool {
        let at = self
            .entries
            .partition_point(|e| e.name.as_str() < prefix);
        self.entries
            .get(at)
            .is_some_and(|e| e.name.starts_with(prefix))
    }

    /// Stored uncompressed size of `entry`, if it exists.
    pub fn entry_size(&self, entry: &str) -> Option<u64> {
        self.index_of(entry).map(|i| self.entries[i].size)
    }

    /// Iterate over all entry names, in sorted order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Read one entry in full.
    ///
    /// Reopens the archive file, reads the entry, and closes the file again
    /// before returning; the descriptor exists only for the span of this
    /// call. Concurrent callers are serialized per handle.
    pub fn read(&self, entry: &str) -> Result<Vec<u8>> {
        let _guard = self.read_lock.lock();
        trace!(archive = %self.path.display(), entry, "opening archive for read");

        let file = File::open(&self.path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut reader = archive.by_name(entry)?;
        let mut buf = Vec::with_capacity(reader.size() as usize);
        reader.read_to_end(&mut buf)?;

        trace!(archive = %self.path.display(), entry, bytes = buf.len(), "closed archive");
        Ok(buf)
    }

    fn index_of(&self, entry: &str) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(entry))
            .ok()
    }
}

/// Process-wide table of shared archive handles, keyed by absolute path.
static HANDLES: LazyLock<Mutex<FxHashMap<PathBuf, Arc<ZipHandle>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// Get the shared handle for the archive at `path`, creating it on first use.
///
/// Every pointer into the same archive file receives a clone of the same
/// `Arc`, so the entry table is scanned once per process.
pub fn zip_handle(path: &Path) -> Result<Arc<ZipHandle>> {
    let abs = std::path::absolute(path)?;
    if let Some(handle) = HANDLES.lock().get(&abs) {
        return Ok(handle.clone());
    }

    // Scan outside the table lock; a racing scan of the same archive is
    // harmless and the first insert wins.
    let handle = Arc::new(ZipHandle::new(&abs)?);
    Ok(HANDLES.lock().entry(abs).or_insert(handle).clone())
}
