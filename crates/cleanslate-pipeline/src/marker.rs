//! Sidecar markers for files stripped in place but not yet relocated.
//!
//! # Design
//! - After a successful strip the pipeline writes `.<name>.cleanslate` next to
//!   the source, recording the backup location and the digest of the stripped
//!   bytes. Hidden names are skipped by the watcher.
//! - A later run whose source still hashes to that digest resumes at relocate
//!   instead of uploading the stripped bytes over the remote original.
//! - The marker is removed once the file reaches the output directory.

use std::io;
use std::path::{Path, PathBuf};

use cleanslate_core::{MetadataMap, RemoteRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MARKER_SUFFIX: &str = "cleanslate";

/// Outcome of an earlier run that stripped the file but did not relocate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SanitizedMarker {
    /// Digest of the bytes that were uploaded.
    pub(crate) original_sha256: Option<String>,
    /// Digest of the file right after stripping.
    pub(crate) sanitized_sha256: String,
    /// Remote copy of the original.
    pub(crate) remote_ref: RemoteRef,
    pub(crate) metadata_before: MetadataMap,
    pub(crate) metadata_after: MetadataMap,
}

/// `<dir>/.<name>.cleanslate` for `<dir>/<name>`.
pub(crate) fn marker_path(source: &Path) -> Option<PathBuf> {
    let name = source.file_name()?;
    Some(source.with_file_name(format!(
        ".{}.{MARKER_SUFFIX}",
        name.to_string_lossy()
    )))
}

/// Marker for `source` whose digest still equals `current_sha256`.
///
/// A marker that no longer matches the file contents is stale and removed.
pub(crate) async fn resume_marker(source: &Path, current_sha256: &str) -> Option<SanitizedMarker> {
    let path = marker_path(source)?;
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(marker = %path.display(), error = %err, "failed to read sanitized marker");
            return None;
        }
    };
    match serde_json::from_slice::<SanitizedMarker>(&raw) {
        Ok(marker) if marker.sanitized_sha256 == current_sha256 => Some(marker),
        Ok(_) => {
            debug!(marker = %path.display(), "file changed since it was stripped; dropping marker");
            remove_marker(source).await;
            None
        }
        Err(err) => {
            warn!(marker = %path.display(), error = %err, "unreadable sanitized marker; dropping it");
            remove_marker(source).await;
            None
        }
    }
}

/// Persist `marker` next to `source`.
pub(crate) async fn write_marker(source: &Path, marker: &SanitizedMarker) -> io::Result<()> {
    let path = marker_path(source)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;
    let body = serde_json::to_vec(marker).map_err(io::Error::other)?;
    tokio::fs::write(&path, body).await
}

pub(crate) async fn remove_marker(source: &Path) {
    let Some(path) = marker_path(source) else {
        return;
    };
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(marker = %path.display(), error = %err, "failed to remove sanitized marker"),
    }
}
