//! Ordered search-path resolution with archive fallback.
//!
//! [`find`] walks an ordered list of roots looking for a resource name.
//! A root can be a directory, a zip archive, or the empty string (meaning
//! the name is itself an absolute path). The first root that yields a
//! verified pointer wins.
//!
//! Names may address archive content two ways. Explicitly, by embedding the
//! archive in the path (`corpora/chat80.zip/chat80/cities.pl`), or
//! implicitly: when a name without any archive component is not found under
//! any root, resolution retries with each path segment wrapped in a
//! same-named archive (`corpora/chat80/cities.pl` →
//! `corpora/chat80.zip/chat80/cities.pl`), so a package can ship its
//! resources zipped without callers noticing.
//!
//! A candidate that does not pan out — a root without the file, an archive
//! without the entry — is never an error; the search just moves on. Only
//! total exhaustion reports [`DataError::NotFound`], listing every root
//! that was consulted.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::archive::zip_handle;
use crate::error::{DataError, Result};
use crate::pointer::{FsPointer, PathPointer, ZipPointer};
use crate::url::normalize_name;

/// File suffix that marks a path segment or search root as an archive.
pub(crate) const ZIP_SUFFIX: &str = ".zip";

/// Environment variable consulted by [`SearchPath::from_env`], holding a
/// platform-separated list of roots.
pub const ENV_VAR: &str = "PKGDATA_PATH";

// =============================================================================
// SearchPath
// =============================================================================

/// The ordered list of roots consulted during resolution.
///
/// Order is significant: earlier roots shadow later ones. The list is read
/// at call time, not snapshotted, so mutations affect subsequent
/// resolutions only.
#[derive(Debug, Default)]
pub struct SearchPath {
    roots: RwLock<Vec<String>>,
}

impl SearchPath {
    /// Create a search path from an explicit list of roots.
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: RwLock::new(roots.into_iter().map(Into::into).collect()),
        }
    }

    /// Build the process-default search path: entries from [`ENV_VAR`]
    /// first, then the user's home data directory, then the shared system
    /// directories for this platform.
    pub fn from_env() -> Self {
        let mut roots = std::env::var_os(ENV_VAR)
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();

        if let Some(home) = home_dir() {
            roots.push(home.join("pkgdata").to_string_lossy().into_owned());
        }
        for dir in platform_default_dirs() {
            roots.push(dir.to_string());
        }
        Self::new(roots)
    }

    /// A copy of the current roots, in order.
    pub fn snapshot(&self) -> Vec<String> {
        self.roots.read().clone()
    }

    /// Append a root at the end (lowest priority).
    pub fn push(&self, root: impl Into<String>) {
        self.roots.write().push(root.into());
    }

    /// Insert a root at `index` (0 = highest priority).
    pub fn insert(&self, index: usize, root: impl Into<String>) {
        self.roots.write().insert(index, root.into());
    }

    /// Replace the whole list.
    pub fn set<I, S>(&self, roots: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.roots.write() = roots.into_iter().map(Into::into).collect();
    }

    /// Remove every root.
    pub fn clear(&self) {
        self.roots.write().clear();
    }

    /// Number of roots.
    pub fn len(&self) -> usize {
        self.roots.read().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.roots.read().is_empty()
    }
}

/// Split a platform path-list value (`a:b` on Unix, `a;b` on Windows),
/// dropping empty entries.
fn parse_path_list(raw: &std::ffi::OsStr) -> Vec<String> {
    std::env::split_paths(raw)
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";
    std::env::var_os(var).map(PathBuf::from)
}

fn platform_default_dirs() -> &'static [&'static str] {
    #[cfg(windows)]
    {
        &["C:\\pkgdata", "D:\\pkgdata", "E:\\pkgdata"]
    }
    #[cfg(not(windows))]
    {
        &[
            "/usr/share/pkgdata",
            "/usr/local/share/pkgdata",
            "/usr/lib/pkgdata",
            "/usr/local/lib/pkgdata",
        ]
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Find `resource_name` under the given roots.
///
/// The name is normalized first (forward slashes, collapsed segments);
/// a trailing slash is required to address a directory inside an archive.
pub fn find(resource_name: &str, roots: &[String]) -> Result<PathPointer> {
    let name = normalize_name(resource_name, true);
    find_normalized(&name, roots)
}

fn find_normalized(name: &str, roots: &[String]) -> Result<PathPointer> {
    let (archive, entry) = split_archive(name);

    for root in roots {
        trace!(root = %root, resource = name, "trying search root");

        // A root that is itself an archive file: look the name up inside it.
        if is_archive_root(root) {
            let Ok(handle) = zip_handle(Path::new(root)) else {
                continue;
            };
            if let Ok(ptr) = ZipPointer::new(handle, name) {
                debug!(root = %root, resource = name, "resolved inside archive root");
                return Ok(ptr.into());
            }
            continue;
        }

        // Otherwise the root must be a directory, or the empty string
        // standing for "the name is already absolute".
        if !root.is_empty() && !Path::new(root).is_dir() {
            continue;
        }

        match &archive {
            None => {
                let candidate = join_root(root, name);
                if let Ok(ptr) = FsPointer::new(&candidate) {
                    debug!(root = %root, resource = name, "resolved on filesystem");
                    return Ok(ptr.into());
                }
            }
            Some(archive_rel) => {
                let candidate = join_root(root, archive_rel);
                if candidate.is_file() {
                    // Entry-not-found here is a miss for this root only.
                    if let Ok(ptr) = ZipPointer::from_path(&candidate, &entry) {
                        debug!(root = %root, resource = name, "resolved archive entry");
                        return Ok(ptr.into());
                    }
                }
            }
        }
    }

    // Nothing literal matched. If the name carries no archive component,
    // retry with each segment wrapped in a same-named archive, shallowest
    // first.
    if archive.is_none() {
        for rewritten in archive_rewrites(name) {
            debug!(resource = name, rewritten = %rewritten, "retrying with archive rewrite");
            if let Ok(ptr) = find_normalized(&rewritten, roots) {
                return Ok(ptr);
            }
        }
    }

    Err(DataError::NotFound {
        resource: name.to_string(),
        searched: roots.to_vec(),
    })
}

fn is_archive_root(root: &str) -> bool {
    !root.is_empty() && root.ends_with(ZIP_SUFFIX) && Path::new(root).is_file()
}

fn join_root(root: &str, rel: &str) -> PathBuf {
    if root.is_empty() {
        // Canonical form writes drive paths as "/C:/…"; drop the leading
        // slash when addressing the filesystem.
        if let Some(stripped) = rel.strip_prefix('/')
            && crate::url::has_drive_prefix(stripped)
        {
            return PathBuf::from(stripped);
        }
        PathBuf::from(rel)
    } else {
        Path::new(root).join(rel)
    }
}

/// Split a name at its first `.zip` segment into (archive path, entry).
fn split_archive(name: &str) -> (Option<String>, String) {
    let segs: Vec<&str> = name.split('/').collect();
    for (i, seg) in segs.iter().enumerate() {
        if seg.ends_with(ZIP_SUFFIX) {
            return (Some(segs[..=i].join("/")), segs[i + 1..].join("/"));
        }
    }
    (None, String::new())
}

/// Every single-segment rewrite `seg` → `seg.zip/seg`, left to right.
fn archive_rewrites(name: &str) -> Vec<String> {
    let segs: Vec<&str> = name.split('/').collect();
    let mut out = Vec::with_capacity(segs.len());
    for (i, seg) in segs.iter().enumerate() {
        if seg.is_empty() {
            continue;
        }
        let mut pieces: Vec<String> = segs[..i].iter().map(ToString::to_string).collect();
        pieces.push(format!("{seg}{ZIP_SUFFIX}"));
        pieces.extend(segs[i..].iter().map(ToString::to_string));
        out.push(pieces.join("/"));
    }
    out
}
