//! Byte streams over resolved resources.
//!
//! A [`ResourceStream`] is what a path pointer's `open` hands back: a
//! buffered reader over a plain file, a gzip-decompressing reader, or an
//! in-memory buffer (archive entries are read whole). The stream itself is
//! always bytes; text decoding is applied on top via [`decode_text`], using
//! the requested encoding or UTF-8 with a lossless Latin-1 fallback.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{DataError, Result};

/// Text encodings understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict UTF-8; decoding fails on invalid sequences.
    Utf8,
    /// ISO-8859-1; every byte maps to a char, so decoding never fails.
    Latin1,
}

impl TextEncoding {
    /// Parse a label such as `"utf-8"` or `"latin-1"`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(Self::Latin1),
            _ => None,
        }
    }
}

/// Decode raw bytes to text.
///
/// With an explicit encoding, that encoding is applied strictly. Without
/// one, UTF-8 is attempted first and Latin-1 is used as a lossless
/// fallback, so arbitrary single-byte content decodes rather than erroring.
pub fn decode_text(
    bytes: Vec<u8>,
    encoding: Option<TextEncoding>,
) -> std::result::Result<String, std::string::FromUtf8Error> {
    match encoding {
        Some(TextEncoding::Utf8) => String::from_utf8(bytes),
        Some(TextEncoding::Latin1) => Ok(latin1(&bytes)),
        None => String::from_utf8(bytes).or_else(|e| Ok(latin1(e.as_bytes()))),
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

enum Source {
    File(BufReader<File>),
    Gzip(BufReader<MultiGzDecoder<BufReader<File>>>),
    Memory(Cursor<Vec<u8>>),
}

/// A read-only byte stream over a resolved resource.
///
/// Created by `PathPointer::open`. Implements [`Read`]; use
/// [`read_bytes`](Self::read_bytes) or [`read_text`](Self::read_text) to
/// consume the whole stream.
pub struct ResourceStream {
    source: Source,
    encoding: Option<TextEncoding>,
}

impl ResourceStream {
    /// Stream a file from disk, decompressing when `gzip` is set.
    pub(crate) fn from_file(
        path: &Path,
        gzip: bool,
        encoding: Option<TextEncoding>,
    ) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        let source = if gzip {
            Source::Gzip(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Source::File(file)
        };
        Ok(Self { source, encoding })
    }

    /// Stream an in-memory buffer, inflating it first when `gzip` is set.
    pub(crate) fn from_bytes(
        data: Vec<u8>,
        gzip: bool,
        encoding: Option<TextEncoding>,
    ) -> Result<Self> {
        let data = if gzip {
            let mut inflated = Vec::new();
            MultiGzDecoder::new(Cursor::new(data)).read_to_end(&mut inflated)?;
            inflated
        } else {
            data
        };
        Ok(Self {
            source: Source::Memory(Cursor::new(data)),
            encoding,
        })
    }

    /// The text encoding requested when the stream was opened, if any.
    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    /// Read the remainder of the stream as raw bytes.
    pub fn read_bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read the remainder of the stream and decode it as text, honoring the
    /// encoding the stream was opened with.
    pub fn read_text(self) -> Result<String> {
        let encoding = self.encoding;
        let bytes = self.read_bytes()?;
        decode_text(bytes, encoding).map_err(|e| {
            DataError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
        })
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::File(r) => r.read(buf),
            Source::Gzip(r) => r.read(buf),
            Source::Memory(r) => r.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn gzip_bytes(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn file_stream_yields_exact_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"exact bytes").unwrap();

        let stream = ResourceStream::from_file(&path, false, None).unwrap();
        assert_eq!(stream.read_bytes().unwrap(), b"exact bytes");
    }

    #[test]
    fn gzip_file_is_decompressed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.txt.gz");
        std::fs::write(&path, gzip_bytes(b"hello gzip")).unwrap();

        let stream = ResourceStream::from_file(&path, true, None).unwrap();
        assert_eq!(stream.read_bytes().unwrap(), b"hello gzip");
    }

    #[test]
    fn gzip_memory_is_inflated_eagerly() {
        let stream =
            ResourceStream::from_bytes(gzip_bytes(b"entry payload"), true, None).unwrap();
        assert_eq!(stream.read_bytes().unwrap(), b"entry payload");
    }

    #[test]
    fn utf8_text_round_trips() {
        let text = "Grüße, 世界";
        assert_eq!(
            decode_text(text.as_bytes().to_vec(), None).unwrap(),
            text
        );
    }

    #[test]
    fn non_utf8_falls_back_to_latin1() {
        // "café" in Latin-1: the 0xE9 byte is invalid UTF-8.
        let bytes = vec![b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text(bytes, None).unwrap(), "café");
    }

    #[test]
    fn explicit_utf8_rejects_invalid_sequences() {
        assert!(decode_text(vec![0xFF, 0xFE], Some(TextEncoding::Utf8)).is_err());
        let stream = ResourceStream::from_bytes(vec![0xFF, 0xFE], false, Some(TextEncoding::Utf8))
            .unwrap();
        assert!(stream.read_text().is_err());
    }

    #[test]
    fn explicit_latin1_never_fails() {
        let all: Vec<u8> = (0u8..=255).collect();
        let decoded = decode_text(all, Some(TextEncoding::Latin1)).unwrap();
        assert_eq!(decoded.chars().count(), 256);
    }

    #[test]
    fn encoding_label_parsing() {
        assert_eq!(TextEncoding::parse("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::parse("iso-8859-1"), Some(TextEncoding::Latin1));
        assert_eq!(TextEncoding::parse("shift-jis"), None);
    }
}
