//! Filesystem and metadata fixtures.

use std::io;
use std::path::{Path, PathBuf};

use cleanslate_core::MetadataMap;
use serde_json::Value;

/// Write `contents` to `dir/name`, returning the full path.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

/// Build a metadata map from `(key, value)` pairs.
#[must_use]
pub fn metadata<const N: usize>(pairs: [(&str, Value); N]) -> MetadataMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Metadata of a camera JPEG carrying a manufacturer tag.
#[must_use]
pub fn camera_metadata() -> MetadataMap {
    metadata([
        ("EXIF:Make", Value::from("Canon")),
        ("File:FileType", Value::from("JPEG")),
    ])
}
