//! Shared HTTP constants (headers, problem URIs, limits).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

pub(crate) const PROBLEM_INTERNAL: &str = "https://cleanslate.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://cleanslate.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://cleanslate.dev/problems/not-found";
pub(crate) const PROBLEM_UNSUPPORTED_TYPE: &str =
    "https://cleanslate.dev/problems/unsupported-file-type";
pub(crate) const PROBLEM_BACKUP_FAILED: &str = "https://cleanslate.dev/problems/backup-failed";

/// Largest accepted upload.
pub(crate) const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;
/// Multipart field carrying the file.
pub(crate) const UPLOAD_FIELD: &str = "file";
/// Events included in `/status`.
pub(crate) const STATUS_RECENT_EVENTS: usize = 20;
