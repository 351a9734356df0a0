//! File types accepted by the pipeline.

use std::path::Path;

use crate::error::{ModelError, ModelResult};

/// Extensions (lower-case, with dot) the metadata stripper handles.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".docx", ".jpeg", ".jpg", ".mov", ".mp4", ".pdf", ".png"];

/// Lower-cased extension of `path` including the leading dot.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

/// Whether `path` has a supported extension (case-insensitive).
#[must_use]
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reject paths whose extension is not supported.
///
/// # Errors
///
/// Returns [`ModelError::UnsupportedFileType`] naming the offending extension.
pub fn ensure_supported(path: &Path) -> ModelResult<()> {
    if is_supported(path) {
        Ok(())
    } else {
        Err(ModelError::UnsupportedFileType {
            path: path.to_path_buf(),
            extension: extension_of(path),
        })
    }
}

/// Human-readable, sorted list of supported extensions.
#[must_use]
pub fn supported_list() -> String {
    SUPPORTED_EXTENSIONS.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_match_case_insensitively() {
        assert!(is_supported(Path::new("/watch/photo.JPG")));
        assert!(is_supported(Path::new("report.pdf")));
        assert!(is_supported(Path::new("clip.MoV")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn ensure_supported_reports_extension() {
        let err = ensure_supported(Path::new("archive.ZIP")).err();
        assert_eq!(
            err,
            Some(ModelError::UnsupportedFileType {
                path: "archive.ZIP".into(),
                extension: Some(".zip".into()),
            })
        );
    }

    #[test]
    fn supported_list_is_sorted() {
        let mut sorted = SUPPORTED_EXTENSIONS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SUPPORTED_EXTENSIONS);
        assert!(supported_list().starts_with(".docx, .jpeg"));
    }
}
