//! # pkgdata
//!
//! Locate and load resources from an installed data package.
//!
//! Resources are named by URL: `pkg:corpora/brown/ca01.txt` searches the
//! data-package search path, `file:/srv/data/lexicon.txt` names a file
//! directly, and `http(s)://…` fetches from a server. A bare name defaults
//! to the `pkg:` scheme. Resolution is archive-aware: a resource may live
//! in a plain directory, inside a zip archive, or inside a same-named zip
//! standing in for a directory (`corpora/chat80/cities.pl` finds
//! `corpora/chat80.zip/chat80/cities.pl` transparently), and archives keep
//! their file descriptors closed between reads.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pkgdata::{Loader, LoadOptions};
//!
//! let loader = Loader::new();
//!
//! // Decoded per the file extension, cached for next time.
//! let words = loader.load("pkg:corpora/words.txt")?;
//! println!("{}", words.as_text().unwrap());
//!
//! // Raw bytes, bypassing the cache.
//! let opts = LoadOptions::new().with_format("raw").without_cache();
//! let model = loader.load_with("pkg:models/tagger.bin.gz", &opts)?;
//! ```
//!
//! ## Pieces
//!
//! - [`url`]: identifier parsing and normalization
//! - [`resolve`]: the ordered search-path walk with archive fallback
//! - [`pointer`]: one handle over plain files and archive entries
//! - [`archive`]: open-on-demand zip handles
//! - [`stream`]: byte streams and text decoding
//! - [`format`]: format registry and decoded values
//! - [`cache`]: the decoded-value cache
//! - [`loader`]: the high-level entry point tying it all together
//! - [`lazy`]: load-on-first-access wrapper

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod cache;
pub mod error;
pub mod format;
pub mod lazy;
pub mod loader;
pub mod pointer;
pub mod resolve;
pub mod stream;
pub mod url;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use pkgdata::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        find, DataError, Format, LoadOptions, Loader, PathPointer, ResourceUrl, Result,
        SearchPath, TextEncoding, Value,
    };
}

// =============================================================================
// Re-exports
// =============================================================================

pub use archive::{zip_handle, ZipHandle};
pub use cache::ResourceCache;
pub use error::{DataError, Result};
pub use format::{
    DecodeParams, DecoderRegistry, ExternalValue, Format, FormatDecoder, Value,
};
pub use lazy::LazyResource;
pub use loader::{LoadOptions, Loader};
pub use pointer::{FsPointer, PathPointer, ZipPointer};
pub use resolve::{find, SearchPath, ENV_VAR};
pub use stream::{decode_text, ResourceStream, TextEncoding};
pub use url::{ResourceUrl, Scheme};
