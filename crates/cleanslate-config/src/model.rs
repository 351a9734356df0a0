//! Typed configuration model.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};

/// Complete runtime configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Whether the directory watcher runs alongside the API.
    pub daemon_mode: bool,
    /// Directory watcher settings.
    pub watch: WatchConfig,
    /// Staging directory for files received over HTTP.
    pub upload_dir: PathBuf,
    /// Default backup destination.
    pub transfer: TransferConfig,
    /// Audit sink settings.
    pub audit: AuditConfig,
    /// Retry policy for collaborator calls.
    pub retry: RetryConfig,
    /// Bounded timeout applied to every collaborator call.
    pub collaborator_timeout: Duration,
    /// HTTP listener settings.
    pub api: ApiConfig,
    /// Enables debug-level logging.
    pub verbose_logging: bool,
}

/// Directory watcher settings.
#[derive(Debug, Clone, Serialize)]
pub struct WatchConfig {
    /// Directory polled for new files.
    pub watch_dir: PathBuf,
    /// Directory receiving sanitized files.
    pub output_dir: PathBuf,
    /// Tick interval.
    pub poll_interval: Duration,
    /// Failed runs tolerated before a file is abandoned.
    pub max_retries: u32,
}

/// Default backup destination.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferConfig {
    /// rclone remote name (`gdrive`).
    pub remote_name: String,
    /// Path on the remote (`backups`).
    pub dest_path: String,
}

/// Audit sink settings.
#[derive(Debug, Clone, Serialize)]
pub struct AuditConfig {
    /// Whether records are written to Firestore.
    pub enabled: bool,
    /// Service-account JSON file.
    pub credentials_path: PathBuf,
    /// Bearer token presented to the REST API.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Emulator `host:port`, switching the client to plain HTTP.
    pub emulator_host: Option<String>,
    /// Capacity of the in-memory retry queue.
    pub queue_capacity: usize,
    /// Interval between queue drain attempts.
    pub retry_interval: Duration,
}

/// Retry policy for collaborator calls.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled afterwards.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl ApiConfig {
    /// Resolve the socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the host is not an IP address.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::invalid("API_HOST", &self.host, "expected ip address"))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_parses_host() -> ConfigResult<()> {
        let api = ApiConfig {
            host: "127.0.0.1".into(),
            port: 8000,
        };
        assert_eq!(api.bind_addr()?.to_string(), "127.0.0.1:8000");

        let bad = ApiConfig {
            host: "localhost".into(),
            port: 8000,
        };
        assert_eq!(bad.bind_addr().err().map(|err| err.field()), Some("API_HOST"));
        Ok(())
    }
}
