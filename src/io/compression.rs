//! Transparent decompression for dataset files.
//!
//! Dumps are commonly shipped compressed (`movie-list.json.gz`). Readers in this
//! crate never look at compression themselves: they call [`open_decompressed`]
//! and get a buffered reader over the plain bytes.
//!
//! ## Detection
//!
//! 1. The file extension is checked first (`.gz`, `.gzip`, and `.zst` when the
//!    `compression-zstd` feature is on).
//! 2. If no extension matches, the first bytes are compared against each
//!    codec's magic signature, so a gzip file without a `.gz` suffix is still
//!    read correctly.
//! 3. Otherwise the stream is returned as-is.
//!
//! The set of codecs is fixed at compile time by feature flags.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A decompression algorithm that can wrap a byte stream.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions including the leading dot.
    fn extensions(&self) -> &[&str];

    /// Magic byte signature at the start of a compressed stream.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` so that reads yield decompressed bytes.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        // Multi-member aware: some dump tools concatenate gzip members.
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}

/// Codecs compiled into this build, in detection order.
static CODECS: &[&dyn CompressionCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
    #[cfg(feature = "compression-zstd")]
    &ZstdCodec,
];

/// Names of the codecs available in this build.
pub fn available_codecs() -> Vec<&'static str> {
    CODECS.iter().map(|c| c.name()).collect()
}

fn detect_from_extension(path: &Path) -> Option<&'static dyn CompressionCodec> {
    let lower = path.to_string_lossy().to_lowercase();
    CODECS
        .iter()
        .copied()
        .find(|codec| codec.extensions().iter().any(|ext| lower.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn CompressionCodec> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    CODECS.iter().copied().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.len() >= magic.len() && buf.starts_with(magic))
    })
}

/// Whether `path` names a compressed file by extension alone.
pub fn has_compressed_extension(path: impl AsRef<Path>) -> bool {
    detect_from_extension(path.as_ref()).is_some()
}

/// Wrap `reader` with decompression if the path or content calls for it.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(path_hint.as_ref()) {
        return codec
            .wrap_reader(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buf_reader) {
        return codec
            .wrap_reader(Box::new(buf_reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buf_reader))
}

/// Open `path` for buffered reading with transparent decompression.
///
/// # Errors
/// Fails if the file cannot be opened or the codec cannot be initialised.
pub fn open_decompressed(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    Ok(Box::new(BufReader::with_capacity(64 * 1024, rdr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_extension_is_not_compressed() {
        assert!(!has_compressed_extension("movies.csv"));
        assert!(!has_compressed_extension("movie-list.json"));
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_extensions_are_detected() {
        assert!(has_compressed_extension("movie-list.json.gz"));
        assert!(has_compressed_extension("MOVIES.CSV.GZ"));
        assert!(available_codecs().contains(&"gzip"));
    }
}
