//! Error type for resource resolution and loading.

use std::fmt::Write as _;

use thiserror::Error;

/// Alias for `Result` with [`DataError`] as the error type.
pub type Result<T> = std::result::Result<T, DataError>;

/// Error type for resource resolution and loading failures.
///
/// Misses inside the search loop (a root that doesn't contain the resource,
/// an archive that doesn't contain the entry) are recovered internally and
/// never surface as individual errors; only total exhaustion produces
/// [`DataError::NotFound`].
#[derive(Debug, Error)]
pub enum DataError {
    /// Resolution exhausted every search root and fallback rewrite.
    ///
    /// The message enumerates the searched roots so a misconfigured search
    /// path is visible at a glance.
    #[error("{}", not_found_message(.resource, .searched))]
    NotFound {
        /// The normalized resource name that was requested.
        resource: String,
        /// Every root that was consulted, in search order.
        searched: Vec<String>,
    },

    /// A located resource could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An archive file could not be opened or read.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The format was not recognized, or could not be inferred from the
    /// resource name's file extension.
    #[error("could not determine format for {0}; pass an explicit format")]
    UnknownFormat(String),

    /// The resource was located and read, but decoding its contents failed.
    #[error("failed to decode {url} as {format}: {message}")]
    Decode {
        /// Canonical URL of the resource.
        url: String,
        /// Name of the format that was being decoded.
        format: String,
        /// Message from the underlying decoder.
        message: String,
    },

    /// A remote resource could not be downloaded.
    #[cfg(feature = "remote")]
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
}

impl DataError {
    /// Create a [`DataError::Decode`] from any decoder error.
    pub fn decode(
        url: impl Into<String>,
        format: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Decode {
            url: url.into(),
            format: format.into(),
            message: message.to_string(),
        }
    }
}

fn not_found_message(resource: &str, searched: &[String]) -> String {
    let mut msg = format!("resource {resource:?} not found; searched in:");
    for root in searched {
        let shown = if root.is_empty() { "<absolute path>" } else { root };
        let _ = write!(msg, "\n    - {shown:?}");
    }
    msg
}
