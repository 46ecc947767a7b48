//! High-level resource loading.
//!
//! A [`Loader`] ties the pieces together: it owns the [`SearchPath`]
//! consulted for `pkg:` URLs, the [`DecoderRegistry`] that maps formats to
//! decoders, and the [`ResourceCache`] of decoded values. Construct one at
//! startup, share it for the life of the process, call
//! [`clear_cache`](Loader::clear_cache) when cached resources should be
//! re-read, and drop it with the host.
//!
//! # Example
//!
//! ```ignore
//! use pkgdata::{Loader, LoadOptions};
//!
//! let loader = Loader::new();
//! let words = loader.load("pkg:corpora/words.txt")?;
//! println!("{}", words.as_text().unwrap());
//!
//! // Explicit format and encoding:
//! let opts = LoadOptions::new().with_format("raw");
//! let bytes = loader.load_with("pkg:models/tagger.bin", &opts)?;
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::ResourceCache;
use crate::error::{DataError, Result};
use crate::format::{DecodeParams, DecoderRegistry, Format, FormatDecoder, Value};
use crate::resolve::{find, SearchPath};
use crate::stream::{decode_text, ResourceStream, TextEncoding};
use crate::url::{ResourceUrl, Scheme};

// =============================================================================
// LoadOptions
// =============================================================================

/// Per-call options for [`Loader::load_with`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    format: Option<String>,
    no_cache: bool,
    encoding: Option<TextEncoding>,
    params: DecodeParams,
}

impl LoadOptions {
    /// Default options: inferred format, caching on, automatic encoding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the named format instead of inferring one from the extension.
    pub fn with_format(mut self, name: impl Into<String>) -> Self {
        self.format = Some(name.into());
        self
    }

    /// Bypass the cache: neither probe it nor store the result.
    pub fn without_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    /// Decode text with this encoding instead of UTF-8 + Latin-1 fallback.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Pass a decoder-specific parameter through to an external decoder.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    fn use_cache(&self) -> bool {
        !self.no_cache
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Resolves, reads, decodes, and caches resources.
pub struct Loader {
    search_path: SearchPath,
    registry: DecoderRegistry,
    cache: ResourceCache,
}

impl Loader {
    /// A loader with the process-default search path (environment variable
    /// plus platform directories).
    pub fn new() -> Self {
        Self::with_search_path(SearchPath::from_env())
    }

    /// A loader searching only the given roots.
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_search_path(SearchPath::new(roots))
    }

    /// A loader with an explicit search path.
    pub fn with_search_path(search_path: SearchPath) -> Self {
        Self {
            search_path,
            registry: DecoderRegistry::new(),
            cache: ResourceCache::new(),
        }
    }

    /// The search path consulted for `pkg:` URLs. Mutations take effect on
    /// the next resolution.
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The decoded-value cache.
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// The format registry.
    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Register an external decoder under `name`, with the extensions that
    /// should infer it.
    pub fn register_decoder(
        &mut self,
        name: impl Into<String>,
        extensions: &[&str],
        decoder: std::sync::Arc<dyn FormatDecoder>,
    ) {
        self.registry.register(name, extensions, decoder);
    }

    /// Drop every cached value.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Load a resource with default options (inferred format, caching on).
    pub fn load(&self, url: &str) -> Result<Value> {
        self.load_with(url, &LoadOptions::default())
    }

    /// Load a resource.
    ///
    /// The URL is normalized, the format inferred from the file extension
    /// when none is given (a `.gz` suffix is ignored for inference), the
    /// cache probed under `(canonical URL, format)`, and on a miss the
    /// resource is resolved, read, decoded, and — best effort — cached.
    pub fn load_with(&self, url: &str, options: &LoadOptions) -> Result<Value> {
        let parsed = ResourceUrl::parse(url);
        let canonical = parsed.to_string();

        let format = match &options.format {
            Some(name) => self.registry.parse(name)?,
            None => self.registry.infer(parsed.path())?,
        };

        if options.use_cache()
            && let Some(value) = self.cache.get(&canonical, &format)
        {
            debug!(url = %canonical, format = %format, "cache hit");
            return Ok(value);
        }

        debug!(url = %canonical, format = %format, "loading");
        let stream = self.open_parsed(&parsed, options.encoding)?;
        let value = self.decode(&canonical, &format, stream, options)?;

        if options.use_cache() {
            self.cache.insert(canonical, format, value.clone());
        }
        Ok(value)
    }

    /// Open a resource's byte stream without decoding or caching.
    pub fn open(&self, url: &str) -> Result<ResourceStream> {
        self.open_parsed(&ResourceUrl::parse(url), None)
    }

    /// Copy a resource to a local file, refusing to overwrite.
    ///
    /// With no `filename`, the last component of the URL path is used,
    /// in the current directory. Returns the destination path.
    pub fn retrieve(&self, url: &str, filename: Option<&Path>) -> Result<PathBuf> {
        let parsed = ResourceUrl::parse(url);
        let dest = match filename {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(default_filename(parsed.path())),
        };

        if dest.exists() {
            return Err(DataError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists; refusing to overwrite", dest.display()),
            )));
        }

        debug!(url = %parsed, dest = %dest.display(), "retrieving");
        let mut stream = self.open_parsed(&parsed, None)?;
        let mut out = std::fs::File::create_new(&dest)?;
        io::copy(&mut stream, &mut out)?;
        Ok(dest)
    }

    fn open_parsed(
        &self,
        url: &ResourceUrl,
        encoding: Option<TextEncoding>,
    ) -> Result<ResourceStream> {
        match url.scheme() {
            Scheme::Package => {
                // The empty root lets an absolute name resolve as itself.
                let mut roots = self.search_path.snapshot();
                roots.push(String::new());
                find(url.path(), &roots)?.open(encoding)
            }
            Scheme::File => find(url.path(), &[String::new()])?.open(encoding),
            Scheme::Network(_) => self.fetch(url, encoding),
        }
    }

    #[cfg(feature = "remote")]
    fn fetch(&self, url: &ResourceUrl, encoding: Option<TextEncoding>) -> Result<ResourceStream> {
        debug!(url = %url, "fetching remote resource");
        let response = reqwest::blocking::get(url.to_string())?.error_for_status()?;
        let bytes = response.bytes()?.to_vec();
        ResourceStream::from_bytes(bytes, false, encoding)
    }

    #[cfg(not(feature = "remote"))]
    fn fetch(&self, url: &ResourceUrl, _encoding: Option<TextEncoding>) -> Result<ResourceStream> {
        Err(DataError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{url}: built without the `remote` feature"),
        )))
    }

    fn decode(
        &self,
        canonical: &str,
        format: &Format,
        stream: ResourceStream,
        options: &LoadOptions,
    ) -> Result<Value> {
        match format {
            Format::Raw => Ok(Value::Raw(stream.read_bytes()?.into())),
            Format::Text => {
                let text = self.read_text(stream, options, canonical, "text")?;
                Ok(Value::Text(text.into()))
            }
            Format::Json => {
                let text = self.read_text(stream, options, canonical, "json")?;
                serde_json::from_str(&text)
                    .map(|v| Value::Json(std::sync::Arc::new(v)))
                    .map_err(|e| DataError::decode(canonical, "json", e))
            }
            Format::Toml => {
                let text = self.read_text(stream, options, canonical, "toml")?;
                text.parse::<toml::Value>()
                    .map(|v| Value::Toml(std::sync::Arc::new(v)))
                    .map_err(|e| DataError::decode(canonical, "toml", e))
            }
            Format::External(name) => {
                let decoder = self
                    .registry
                    .decoder(name)
                    .ok_or_else(|| DataError::UnknownFormat(name.clone()))?;
                let text = self.read_text(stream, options, canonical, name)?;
                decoder.decode(&text, &options.params)
            }
        }
    }

    fn read_text(
        &self,
        stream: ResourceStream,
        options: &LoadOptions,
        canonical: &str,
        format_name: &str,
    ) -> Result<String> {
        let bytes = stream.read_bytes()?;
        decode_text(bytes, options.encoding)
            .map_err(|e| DataError::decode(canonical, format_name, e))
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn default_filename(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("resource")
        .to_string()
}
