//! Default values and environment variable names.

/// Whether the directory watcher runs alongside the API.
pub const DAEMON_MODE: bool = true;
/// Default watched directory.
pub const WATCH_DIR: &str = "/data/watch";
/// Default relocation target.
pub const OUTPUT_DIR: &str = "/data/clean";
/// Directory name (under the system temp dir) for staged uploads.
pub const UPLOAD_DIR_NAME: &str = "cleanslate-uploads";
/// Default rclone remote.
pub const RCLONE_REMOTE_NAME: &str = "gdrive";
/// Default path on the remote.
pub const RCLONE_DEST_PATH: &str = "backups";
/// Whether the Firestore audit sink is enabled.
pub const FIREBASE_ENABLED: bool = true;
/// Default service-account credentials path.
pub const FIREBASE_CREDENTIALS: &str = "/app/firebase-service-account.json";
/// Whether debug logging is enabled.
pub const VERBOSE_LOGGING: bool = false;
/// Default HTTP bind host.
pub const API_HOST: &str = "0.0.0.0";
/// Default HTTP bind port.
pub const API_PORT: u16 = 8000;
/// Watcher tick interval in milliseconds.
pub const WATCH_POLL_INTERVAL_MS: u64 = 2_000;
/// Failed runs tolerated before the watcher abandons a file.
pub const WATCH_MAX_RETRIES: u32 = 5;
/// Attempts per retried collaborator call.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
/// Base backoff delay in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 500;
/// Upper bound for a single backoff delay in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;
/// Per-call collaborator timeout in seconds.
pub const COLLABORATOR_TIMEOUT_SECS: u64 = 300;
/// Capacity of the audit retry queue.
pub const AUDIT_QUEUE_CAPACITY: usize = 256;
/// Audit queue drain interval in milliseconds.
pub const AUDIT_RETRY_INTERVAL_MS: u64 = 5_000;

/// Environment variable names.
pub mod env {
    /// See [`super::DAEMON_MODE`].
    pub const DAEMON_MODE: &str = "DAEMON_MODE";
    /// See [`super::WATCH_DIR`].
    pub const WATCH_DIR: &str = "WATCH_DIR";
    /// See [`super::OUTPUT_DIR`].
    pub const OUTPUT_DIR: &str = "OUTPUT_DIR";
    /// Staging directory for uploads.
    pub const UPLOAD_DIR: &str = "UPLOAD_DIR";
    /// See [`super::RCLONE_REMOTE_NAME`].
    pub const RCLONE_REMOTE_NAME: &str = "RCLONE_REMOTE_NAME";
    /// See [`super::RCLONE_DEST_PATH`].
    pub const RCLONE_DEST_PATH: &str = "RCLONE_DEST_PATH";
    /// See [`super::FIREBASE_ENABLED`].
    pub const FIREBASE_ENABLED: &str = "FIREBASE_ENABLED";
    /// See [`super::FIREBASE_CREDENTIALS`].
    pub const FIREBASE_CREDENTIALS: &str = "FIREBASE_CREDENTIALS";
    /// Bearer token presented to Firestore.
    pub const FIREBASE_ACCESS_TOKEN: &str = "FIREBASE_ACCESS_TOKEN";
    /// Firestore emulator `host:port`.
    pub const FIRESTORE_EMULATOR_HOST: &str = "FIRESTORE_EMULATOR_HOST";
    /// See [`super::VERBOSE_LOGGING`].
    pub const VERBOSE_LOGGING: &str = "VERBOSE_LOGGING";
    /// See [`super::API_HOST`].
    pub const API_HOST: &str = "API_HOST";
    /// See [`super::API_PORT`].
    pub const API_PORT: &str = "API_PORT";
    /// See [`super::WATCH_POLL_INTERVAL_MS`].
    pub const WATCH_POLL_INTERVAL_MS: &str = "WATCH_POLL_INTERVAL_MS";
    /// See [`super::WATCH_MAX_RETRIES`].
    pub const WATCH_MAX_RETRIES: &str = "WATCH_MAX_RETRIES";
    /// See [`super::RETRY_MAX_ATTEMPTS`].
    pub const RETRY_MAX_ATTEMPTS: &str = "RETRY_MAX_ATTEMPTS";
    /// See [`super::RETRY_BASE_DELAY_MS`].
    pub const RETRY_BASE_DELAY_MS: &str = "RETRY_BASE_DELAY_MS";
    /// See [`super::COLLABORATOR_TIMEOUT_SECS`].
    pub const COLLABORATOR_TIMEOUT_SECS: &str = "COLLABORATOR_TIMEOUT_SECS";
    /// See [`super::AUDIT_QUEUE_CAPACITY`].
    pub const AUDIT_QUEUE_CAPACITY: &str = "AUDIT_QUEUE_CAPACITY";
    /// See [`super::AUDIT_RETRY_INTERVAL_MS`].
    pub const AUDIT_RETRY_INTERVAL_MS: &str = "AUDIT_RETRY_INTERVAL_MS";
}
