//! Formats, decoded values, and the decoder registry.
//!
//! A [`Format`] names the decoding strategy applied to a resource's bytes.
//! Four formats are built in: `raw` (bytes), `text` (decoded string),
//! `json`, and `toml`. Everything else — grammar files, logic expressions,
//! model dumps — is an external format: a name registered in the
//! [`DecoderRegistry`] together with a [`FormatDecoder`] that turns decoded
//! text into a [`Value`].
//!
//! The registry also owns the extension map used when a caller passes no
//! format: the resource name's final extension (after stripping a `.gz`
//! suffix) picks the format, and an unmapped extension is an
//! [`UnknownFormat`](crate::DataError::UnknownFormat) error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{DataError, Result};
use crate::pointer::GZIP_SUFFIX;

// =============================================================================
// Format
// =============================================================================

/// A named decoding strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    /// The raw bytes of the resource, unchanged.
    Raw,
    /// The contents decoded to a string (UTF-8 with Latin-1 fallback, or an
    /// explicitly requested encoding).
    Text,
    /// A JSON document.
    Json,
    /// A TOML document.
    Toml,
    /// A format handled by a decoder registered under this name.
    External(String),
}

impl Format {
    /// The format's registered name.
    pub fn name(&self) -> &str {
        match self {
            Self::Raw => "raw",
            Self::Text => "text",
            Self::Json => "json",
            Self::Toml => "toml",
            Self::External(name) => name,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Value
// =============================================================================

/// A decoded value produced by an external [`FormatDecoder`].
///
/// Implementors can veto caching by overriding [`cacheable`](Self::cacheable);
/// the loader then skips the cache insert silently instead of failing the
/// load.
pub trait ExternalValue: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting via [`Value::downcast_external`].
    fn as_any(&self) -> &dyn Any;

    /// Whether this value may be retained in the resource cache.
    fn cacheable(&self) -> bool {
        true
    }
}

/// A decoded resource value.
///
/// Payloads are behind `Arc`, so clones handed out by the cache share one
/// underlying object.
#[derive(Debug, Clone)]
pub enum Value {
    /// Raw bytes.
    Raw(Arc<[u8]>),
    /// Decoded text.
    Text(Arc<str>),
    /// A parsed JSON document.
    Json(Arc<serde_json::Value>),
    /// A parsed TOML document.
    Toml(Arc<toml::Value>),
    /// A value produced by an external decoder.
    External(Arc<dyn ExternalValue>),
}

impl Value {
    /// The raw bytes, when this is a `Raw` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(b) => Some(b),
            _ => None,
        }
    }

    /// The text, when this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// The JSON document, when this is a `Json` value.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The TOML document, when this is a `Toml` value.
    pub fn as_toml(&self) -> Option<&toml::Value> {
        match self {
            Self::Toml(v) => Some(v),
            _ => None,
        }
    }

    /// Downcast an external value to its concrete type.
    pub fn downcast_external<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::External(v) => v.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Whether two values share the same underlying storage.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Raw(a), Self::Raw(b)) => Arc::ptr_eq(a, b),
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b),
            (Self::Json(a), Self::Json(b)) => Arc::ptr_eq(a, b),
            (Self::Toml(a), Self::Toml(b)) => Arc::ptr_eq(a, b),
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn cacheable(&self) -> bool {
        match self {
            Self::External(v) => v.cacheable(),
            _ => true,
        }
    }
}

// =============================================================================
// Decoder registry
// =============================================================================

/// Decoder-specific parameters passed through [`crate::LoadOptions`].
pub type DecodeParams = FxHashMap<String, String>;

/// Turns decoded text into a [`Value`] for one external format.
pub trait FormatDecoder: Send + Sync {
    /// Decode `text`, with any decoder-specific `params` the caller
    /// supplied at load time.
    fn decode(&self, text: &str, params: &DecodeParams) -> Result<Value>;
}

/// The set of recognized formats and the extension map for inference.
pub struct DecoderRegistry {
    decoders: FxHashMap<String, Arc<dyn FormatDecoder>>,
    extensions: FxHashMap<String, Format>,
}

impl DecoderRegistry {
    /// A registry with the built-in formats and their extensions.
    pub fn new() -> Self {
        let mut extensions = FxHashMap::default();
        for (ext, format) in [
            ("json", Format::Json),
            ("toml", Format::Toml),
            ("txt", Format::Text),
            ("text", Format::Text),
        ] {
            extensions.insert(ext.to_string(), format);
        }
        Self {
            decoders: FxHashMap::default(),
            extensions,
        }
    }

    /// Register an external decoder under `name`, mapping each extension in
    /// `extensions` to it for format inference.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        extensions: &[&str],
        decoder: Arc<dyn FormatDecoder>,
    ) {
        let name = name.into();
        for ext in extensions {
            self.extensions
                .insert((*ext).to_string(), Format::External(name.clone()));
        }
        self.decoders.insert(name, decoder);
    }

    /// Resolve a format name, failing on unrecognized names.
    pub fn parse(&self, name: &str) -> Result<Format> {
        match name {
            "raw" => Ok(Format::Raw),
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            other if self.decoders.contains_key(other) => {
                Ok(Format::External(other.to_string()))
            }
            other => Err(DataError::UnknownFormat(other.to_string())),
        }
    }

    /// Infer a format from a resource name's final extension.
    ///
    /// A `.gz` suffix is stripped first, so `words.txt.gz` infers `text`.
    pub fn infer(&self, resource: &str) -> Result<Format> {
        let name = resource.rsplit('/').next().unwrap_or(resource);
        let name = name.strip_suffix(GZIP_SUFFIX).unwrap_or(name);
        name.rsplit_once('.')
            .and_then(|(_, ext)| self.extensions.get(ext).cloned())
            .ok_or_else(|| DataError::UnknownFormat(resource.to_string()))
    }

    /// The decoder registered for an external format, if any.
    pub fn decoder(&self, name: &str) -> Option<Arc<dyn FormatDecoder>> {
        self.decoders.get(name).cloned()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct LineCount(usize);

    impl ExternalValue for LineCount {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct LineCountDecoder;

    impl FormatDecoder for LineCountDecoder {
        fn decode(&self, text: &str, _params: &DecodeParams) -> Result<Value> {
            Ok(Value::External(Arc::new(LineCount(text.lines().count()))))
        }
    }

    #[test]
    fn builtin_format_names_parse() {
        let registry = DecoderRegistry::new();
        assert_eq!(registry.parse("raw").unwrap(), Format::Raw);
        assert_eq!(registry.parse("text").unwrap(), Format::Text);
        assert_eq!(registry.parse("json").unwrap(), Format::Json);
        assert_eq!(registry.parse("toml").unwrap(), Format::Toml);
        assert!(matches!(
            registry.parse("cfg"),
            Err(DataError::UnknownFormat(_))
        ));
    }

    #[test]
    fn extension_inference() {
        let registry = DecoderRegistry::new();
        assert_eq!(registry.infer("corpora/words.txt").unwrap(), Format::Text);
        assert_eq!(registry.infer("meta/info.json").unwrap(), Format::Json);
        assert_eq!(registry.infer("conf/site.toml").unwrap(), Format::Toml);
        // .gz is stripped before looking at the extension.
        assert_eq!(registry.infer("corpora/words.txt.gz").unwrap(), Format::Text);
        assert!(matches!(
            registry.infer("grammar.xyz"),
            Err(DataError::UnknownFormat(_))
        ));
        assert!(matches!(
            registry.infer("no-extension"),
            Err(DataError::UnknownFormat(_))
        ));
    }

    #[test]
    fn registered_decoders_extend_parsing_and_inference() {
        let mut registry = DecoderRegistry::new();
        registry.register("linecount", &["lc"], Arc::new(LineCountDecoder));

        assert_eq!(
            registry.parse("linecount").unwrap(),
            Format::External("linecount".into())
        );
        assert_eq!(
            registry.infer("data/sample.lc").unwrap(),
            Format::External("linecount".into())
        );

        let decoder = registry.decoder("linecount").unwrap();
        let value = decoder.decode("a\nb\nc", &DecodeParams::default()).unwrap();
        let count = value.downcast_external::<LineCount>().unwrap();
        assert_eq!(count.0, 3);
    }

    #[test]
    fn value_accessors() {
        let text = Value::Text(Arc::from("hello"));
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_bytes().is_none());

        let raw = Value::Raw(Arc::from(&b"bytes"[..]));
        assert_eq!(raw.as_bytes(), Some(&b"bytes"[..]));

        let clone = text.clone();
        assert!(text.ptr_eq(&clone));
        assert!(!text.ptr_eq(&raw));
    }

    #[derive(Debug)]
    struct Transient;

    impl ExternalValue for Transient {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn cacheable(&self) -> bool {
            false
        }
    }

    #[test]
    fn external_values_can_veto_caching() {
        let value = Value::External(Arc::new(Transient));
        assert!(!value.cacheable());
        assert!(Value::Text(Arc::from("x")).cacheable());
    }
}
