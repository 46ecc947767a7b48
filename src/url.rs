//! Resource URL parsing and normalization.
//!
//! A resource identifier is a `scheme:path` string where the scheme is one
//! of `pkg` (a name resolved against the data-package search path), `file`
//! (a filesystem path), or a network protocol such as `http`/`https`. A
//! missing scheme defaults to `pkg`.
//!
//! Normalization produces one canonical spelling per resource: paths always
//! use forward slashes, `.`/`..` segments are collapsed, `file` paths are
//! absolute, and the canonical string doubles as the cache key. Normalizing
//! an already-canonical URL is a no-op.

use std::fmt;

/// Protocol of a [`ResourceUrl`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// A name resolved against the data-package search path (`pkg:`).
    Package,
    /// An absolute filesystem path (`file:`).
    File,
    /// A remote resource; the payload is the concrete protocol
    /// (`"http"`, `"https"`, ...), kept so the URL can be reassembled.
    Network(String),
}

impl Scheme {
    /// The scheme token as it appears before the colon.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Package => "pkg",
            Self::File => "file",
            Self::Network(proto) => proto,
        }
    }
}

/// A parsed, canonicalized resource identifier.
///
/// Construct with [`ResourceUrl::parse`]; immutable afterwards. The
/// `Display` form is the canonical spelling used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUrl {
    scheme: Scheme,
    path: String,
}

impl ResourceUrl {
    /// Parse and normalize a raw resource identifier.
    ///
    /// Never fails: input without a recognizable `scheme:` prefix is taken
    /// as a `pkg` name, and a `pkg` name that is an absolute path (leading
    /// slash or drive letter) is reinterpreted as a `file` URL.
    pub fn parse(raw: &str) -> Self {
        let (token, rest) = match split_scheme(raw) {
            Some((token, rest)) => (token, rest),
            None => ("pkg", raw),
        };

        match token.to_ascii_lowercase().as_str() {
            "pkg" => {
                if is_absolute_like(rest) {
                    Self {
                        scheme: Scheme::File,
                        path: normalize_name(rest, false),
                    }
                } else {
                    Self {
                        scheme: Scheme::Package,
                        path: normalize_name(rest, true),
                    }
                }
            }
            "file" => Self {
                scheme: Scheme::File,
                path: normalize_name(rest, false),
            },
            proto => {
                // Remote identifiers pass through untouched apart from the
                // `scheme://` reassembly.
                let path = rest
                    .strip_prefix("//")
                    .or_else(|| rest.strip_prefix('/'))
                    .unwrap_or(rest);
                Self {
                    scheme: Scheme::Network(proto.to_string()),
                    path: path.to_string(),
                }
            }
        }
    }

    /// The URL's scheme.
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The normalized, forward-slash path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The canonical string form, used as the cache key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scheme {
            Scheme::Package => write!(f, "pkg:{}", self.path),
            // File paths start with a slash, yielding the usual `file:///`.
            Scheme::File => write!(f, "file://{}", self.path),
            Scheme::Network(proto) => write!(f, "{}://{}", proto, self.path),
        }
    }
}

/// Split `scheme:rest`, returning `None` when the prefix is not a scheme.
///
/// A single-letter prefix is a drive letter, not a scheme, so `C:/dir` parses
/// as a path.
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let (token, rest) = raw.split_once(':')?;
    let mut chars = token.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || token.len() < 2 {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((token, rest))
}

/// Whether a `pkg` path should be reinterpreted as a filesystem path.
fn is_absolute_like(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path)
}

pub(crate) fn has_drive_prefix(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2
        && b[0].is_ascii_alphabetic()
        && b[1] == b':'
        && (b.len() == 2 || b[2] == b'/' || b[2] == b'\\')
}

/// Normalize a resource name to canonical forward-slash form.
///
/// With `allow_relative` the name is collapsed lexically and stays relative;
/// otherwise it is anchored at the current directory and made absolute.
/// Directory-like names (trailing slash, backslash, or dot) keep a single
/// trailing slash. Drive-letter paths gain a single leading slash, so
/// `C:/dir/file` and `/C:/dir/file` normalize identically.
pub(crate) fn normalize_name(name: &str, allow_relative: bool) -> String {
    let is_dir = matches!(name.chars().last(), Some('/' | '\\' | '.'));

    let mut s = name.replace('\\', "/");
    if s.starts_with('/') {
        // Redundant leading slashes collapse to one.
        s = format!("/{}", s.trim_start_matches('/'));
    }

    if !allow_relative && !s.starts_with('/') && !has_drive_prefix(&s) {
        let cwd = std::env::current_dir().unwrap_or_default();
        let cwd = cwd.to_string_lossy().replace('\\', "/");
        s = format!("{cwd}/{s}");
    }

    let mut s = collapse(&s);
    if has_drive_prefix(&s) {
        s.insert(0, '/');
    }
    if is_dir && !s.ends_with('/') {
        s.push('/');
    }
    s
}

/// Collapse `.` and `..` segments lexically, without touching the filesystem.
fn collapse(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&"..") => parts.push(".."),
                Some(_) => {
                    parts.pop();
                }
                // `..` above the root collapses away; above a relative
                // name it is preserved.
                None if !absolute => parts.push(".."),
                None => {}
            },
            seg => parts.push(seg),
        }
    }

    if absolute {
        format!("/{}", parts.join("/"))
    } else if parts.is_empty() {
        "./".to_string()
    } else {
        parts.join("/")
    }
}
