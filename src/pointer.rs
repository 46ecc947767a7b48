//! Path pointers: one handle over plain files and archive entries.
//!
//! A [`PathPointer`] names a verified location a resource can be read from,
//! hiding whether that location is a file on disk ([`FsPointer`]) or an
//! entry inside a zip archive ([`ZipPointer`]). Both variants support the
//! same three operations: `open` (yielding a [`ResourceStream`]), `size`,
//! and `join`.
//!
//! Construction checks existence: a filesystem pointer requires the path to
//! exist, an archive pointer requires the entry to be present in the
//! archive's table, either literally or as a directory prefix of some entry.
//! The one exception is `ZipPointer::join`, which concatenates entry names
//! without re-validating; validation is deferred to `open`/`size`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::{zip_handle, ZipHandle};
use crate::error::{DataError, Result};
use crate::stream::{ResourceStream, TextEncoding};
use crate::url::normalize_name;

/// File suffix treated as gzip-compressed content.
pub(crate) const GZIP_SUFFIX: &str = ".gz";

/// A verified location a resource can be read from.
#[derive(Debug, Clone)]
pub enum PathPointer {
    /// A plain file (or directory) on the local filesystem.
    FileSystem(FsPointer),
    /// An entry inside a zip archive.
    Zip(ZipPointer),
}

impl PathPointer {
    /// Open the pointed-to resource for reading.
    ///
    /// Content whose name ends in `.gz` is decompressed transparently. When
    /// `encoding` is given the stream decodes to text via
    /// [`ResourceStream::read_text`]; otherwise it is binary.
    pub fn open(&self, encoding: Option<TextEncoding>) -> Result<ResourceStream> {
        match self {
            Self::FileSystem(p) => p.open(encoding),
            Self::Zip(p) => p.open(encoding),
        }
    }

    /// Size of the underlying content in bytes, where determinable.
    ///
    /// Compressed content reports `None`: the on-disk length is not the
    /// length a reader will see.
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::FileSystem(p) => p.size(),
            Self::Zip(p) => p.size(),
        }
    }

    /// A new pointer for `fileid` resolved relative to this pointer.
    ///
    /// `fileid` uses forward slashes regardless of platform.
    pub fn join(&self, fileid: &str) -> Result<PathPointer> {
        match self {
            Self::FileSystem(p) => Ok(Self::FileSystem(p.join(fileid)?)),
            Self::Zip(p) => Ok(Self::Zip(p.join(fileid))),
        }
    }
}

impl fmt::Display for PathPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileSystem(p) => write!(f, "{}", p.path().display()),
            Self::Zip(p) => write!(f, "{p}"),
        }
    }
}

impl From<FsPointer> for PathPointer {
    fn from(p: FsPointer) -> Self {
        Self::FileSystem(p)
    }
}

impl From<ZipPointer> for PathPointer {
    fn from(p: ZipPointer) -> Self {
        Self::Zip(p)
    }
}

/// Pointer to a file that exists on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsPointer {
    path: PathBuf,
}

impl FsPointer {
    /// Create a pointer for `path`, made absolute and checked for existence.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        if !path.exists() {
            return Err(DataError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file or directory: {}", path.display()),
            )));
        }
        Ok(Self { path })
    }

    /// The absolute path this pointer identifies.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_gzip(&self) -> bool {
        self.path
            .to_str()
            .is_some_and(|p| p.ends_with(GZIP_SUFFIX))
    }

    /// Open the file, decompressing `.gz` content.
    pub fn open(&self, encoding: Option<TextEncoding>) -> Result<ResourceStream> {
        ResourceStream::from_file(&self.path, self.is_gzip(), encoding)
    }

    /// Byte length of the file; `None` for compressed content.
    pub fn size(&self) -> Option<u64> {
        if self.is_gzip() {
            return None;
        }
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Join a forward-slash relative id onto this path.
    pub fn join(&self, fileid: &str) -> Result<FsPointer> {
        Self::new(self.path.join(fileid))
    }
}

/// Pointer to an entry inside a zip archive.
///
/// The archive handle is shared: every pointer into the same archive file
/// clones one [`ZipHandle`].
#[derive(Debug, Clone)]
pub struct ZipPointer {
    archive: Arc<ZipHandle>,
    entry: String,
}

impl ZipPointer {
    /// Create a pointer into `archive`, verifying that `entry` exists.
    ///
    /// The entry is normalized to a relative forward-slash path with no
    /// leading slash. An empty entry names the archive root. A
    /// directory-like entry (trailing slash) also matches when the archive
    /// merely contains files under that directory.
    pub fn new(archive: Arc<ZipHandle>, entry: &str) -> Result<Self> {
        let entry = normalize_entry(entry);
        if !entry.is_empty()
            && !archive.contains(&entry)
            && !(entry.ends_with('/') && archive.contains_prefix(&entry))
        {
            return Err(DataError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "archive {} does not contain {entry:?}",
                    archive.path().display()
                ),
            )));
        }
        Ok(Self { archive, entry })
    }

    /// Create a pointer for the archive at `zip_path`, via the shared
    /// handle table.
    pub fn from_path(zip_path: &Path, entry: &str) -> Result<Self> {
        Self::new(zip_handle(zip_path)?, entry)
    }

    /// The shared handle for the containing archive.
    pub fn archive(&self) -> &Arc<ZipHandle> {
        &self.archive
    }

    /// The archive-relative entry name.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    fn is_gzip(&self) -> bool {
        self.entry.ends_with(GZIP_SUFFIX)
    }

    /// Read the whole entry through the shared handle and stream it from
    /// memory, decompressing `.gz` entries.
    pub fn open(&self, encoding: Option<TextEncoding>) -> Result<ResourceStream> {
        let data = self.archive.read(&self.entry)?;
        ResourceStream::from_bytes(data, self.is_gzip(), encoding)
    }

    /// Stored uncompressed size of the entry; `None` for `.gz` entries and
    /// for directory entries.
    pub fn size(&self) -> Option<u64> {
        if self.is_gzip() {
            return None;
        }
        self.archive.entry_size(&self.entry)
    }

    /// Concatenate `fileid` onto this entry.
    ///
    /// No existence check happens here; an invalid joined entry surfaces
    /// when it is opened or sized.
    pub fn join(&self, fileid: &str) -> ZipPointer {
        let entry = if self.entry.is_empty() {
            fileid.to_string()
        } else {
            format!("{}/{fileid}", self.entry.trim_end_matches('/'))
        };
        Self {
            archive: self.archive.clone(),
            entry,
        }
    }
}

impl fmt::Display for ZipPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.archive.path().display(), self.entry)
    }
}

/// Normalize an archive entry to relative forward-slash form.
fn normalize_entry(entry: &str) -> String {
    let entry = normalize_name(entry, true);
    let entry = entry.trim_start_matches('/');
    if entry == "./" {
        String::new()
    } else {
        entry.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn fs_pointer_requires_existence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("present.txt");
        std::fs::write(&path, b"here").unwrap();

        assert!(FsPointer::new(&path).is_ok());
        assert!(FsPointer::new(dir.path().join("absent.txt")).is_err());
    }

    #[test]
    fn fs_pointer_reads_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"contents").unwrap();

        let ptr = FsPointer::new(&path).unwrap();
        assert_eq!(ptr.open(None).unwrap().read_bytes().unwrap(), b"contents");
        assert_eq!(ptr.size(), Some(8));
    }

    #[test]
    fn fs_pointer_decompresses_gz() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt.gz");
        std::fs::write(&path, gzip_bytes(b"inflated")).unwrap();

        let ptr = FsPointer::new(&path).unwrap();
        assert_eq!(ptr.open(None).unwrap().read_bytes().unwrap(), b"inflated");
        assert_eq!(ptr.size(), None);
    }

    #[test]
    fn fs_pointer_join_validates() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/f.txt"), b"x").unwrap();

        let ptr = FsPointer::new(dir.path()).unwrap();
        assert!(ptr.join("sub/f.txt").is_ok());
        assert!(ptr.join("sub/missing.txt").is_err());
    }

    #[test]
    fn zip_pointer_checks_entries() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        write_zip(&zip_path, &[("brown/a.txt", b"alpha")]);

        let ptr = ZipPointer::from_path(&zip_path, "brown/a.txt").unwrap();
        assert_eq!(ptr.open(None).unwrap().read_bytes().unwrap(), b"alpha");
        assert_eq!(ptr.size(), Some(5));

        assert!(ZipPointer::from_path(&zip_path, "brown/missing.txt").is_err());
    }

    #[test]
    fn zip_pointer_matches_directory_prefixes() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        write_zip(&zip_path, &[("brown/a.txt", b"alpha")]);

        // Directories need the trailing slash; without it the entry must
        // exist literally.
        assert!(ZipPointer::from_path(&zip_path, "brown/").is_ok());
        assert!(ZipPointer::from_path(&zip_path, "brown").is_err());
    }

    #[test]
    fn zip_pointer_join_defers_validation() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        write_zip(&zip_path, &[("brown/a.txt", b"alpha")]);

        let root = ZipPointer::from_path(&zip_path, "brown/").unwrap();
        let good = root.join("a.txt");
        assert_eq!(good.entry(), "brown/a.txt");
        assert_eq!(good.open(None).unwrap().read_bytes().unwrap(), b"alpha");

        let bad = root.join("nope.txt");
        assert!(bad.open(None).is_err());
        assert_eq!(bad.size(), None);
    }

    #[test]
    fn zip_pointer_decompresses_gz_entries() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        let gz = gzip_bytes(b"model data");
        write_zip(&zip_path, &[("models/big.bin.gz", gz.as_slice())]);

        let ptr = ZipPointer::from_path(&zip_path, "models/big.bin.gz").unwrap();
        assert_eq!(ptr.open(None).unwrap().read_bytes().unwrap(), b"model data");
        assert_eq!(ptr.size(), None);
    }

    #[test]
    fn pointers_share_one_handle_per_archive() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        write_zip(&zip_path, &[("a.txt", b"1"), ("b.txt", b"2")]);

        let a = ZipPointer::from_path(&zip_path, "a.txt").unwrap();
        let b = ZipPointer::from_path(&zip_path, "b.txt").unwrap();
        assert!(Arc::ptr_eq(a.archive(), b.archive()));
    }

    #[test]
    fn display_forms() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("c.zip");
        write_zip(&zip_path, &[("a.txt", b"1")]);

        let ptr: PathPointer = ZipPointer::from_path(&zip_path, "a.txt").unwrap().into();
        let shown = ptr.to_string();
        assert!(shown.ends_with("c.zip/a.txt"));
    }
}
