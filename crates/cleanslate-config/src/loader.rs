//! Loading [`AppConfig`] from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::defaults::{self, env};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ApiConfig, AppConfig, AuditConfig, RetryConfig, TransferConfig, WatchConfig};
use crate::validate::{parse_bool, parse_positive};

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Raw value with empty strings treated as unset.
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or_else(|| default.to_string())
    }

    fn path(&self, key: &str, default: PathBuf) -> PathBuf {
        self.raw(key).map_or(default, PathBuf::from)
    }

    fn flag(&self, key: &'static str, default: bool) -> ConfigResult<bool> {
        self.raw(key)
            .map_or(Ok(default), |raw| parse_bool(key, &raw))
    }

    fn positive<T>(&self, key: &'static str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + PartialOrd + Default,
    {
        self.raw(key)
            .map_or(Ok(default), |raw| parse_positive(key, &raw))
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable holds an invalid value or the
    /// audit credentials file is required but missing.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let audit_enabled = source.flag(env::FIREBASE_ENABLED, defaults::FIREBASE_ENABLED)?;
        let credentials_path = source.path(
            env::FIREBASE_CREDENTIALS,
            PathBuf::from(defaults::FIREBASE_CREDENTIALS),
        );
        if audit_enabled && !credentials_path.is_file() {
            return Err(ConfigError::MissingFile {
                field: env::FIREBASE_CREDENTIALS,
                path: credentials_path,
            });
        }

        let port = source.positive(env::API_PORT, defaults::API_PORT)?;

        let config = Self {
            daemon_mode: source.flag(env::DAEMON_MODE, defaults::DAEMON_MODE)?,
            watch: WatchConfig {
                watch_dir: source.path(env::WATCH_DIR, PathBuf::from(defaults::WATCH_DIR)),
                output_dir: source.path(env::OUTPUT_DIR, PathBuf::from(defaults::OUTPUT_DIR)),
                poll_interval: Duration::from_millis(source.positive(
                    env::WATCH_POLL_INTERVAL_MS,
                    defaults::WATCH_POLL_INTERVAL_MS,
                )?),
                max_retries: source
                    .positive(env::WATCH_MAX_RETRIES, defaults::WATCH_MAX_RETRIES)?,
            },
            upload_dir: source.path(
                env::UPLOAD_DIR,
                std::env::temp_dir().join(defaults::UPLOAD_DIR_NAME),
            ),
            transfer: TransferConfig {
                remote_name: source.string(env::RCLONE_REMOTE_NAME, defaults::RCLONE_REMOTE_NAME),
                dest_path: source.string(env::RCLONE_DEST_PATH, defaults::RCLONE_DEST_PATH),
            },
            audit: AuditConfig {
                enabled: audit_enabled,
                credentials_path,
                access_token: source.raw(env::FIREBASE_ACCESS_TOKEN),
                emulator_host: source.raw(env::FIRESTORE_EMULATOR_HOST),
                queue_capacity: source
                    .positive(env::AUDIT_QUEUE_CAPACITY, defaults::AUDIT_QUEUE_CAPACITY)?,
                retry_interval: Duration::from_millis(source.positive(
                    env::AUDIT_RETRY_INTERVAL_MS,
                    defaults::AUDIT_RETRY_INTERVAL_MS,
                )?),
            },
            retry: RetryConfig {
                max_attempts: source
                    .positive(env::RETRY_MAX_ATTEMPTS, defaults::RETRY_MAX_ATTEMPTS)?,
                base_delay: Duration::from_millis(
                    source.positive(env::RETRY_BASE_DELAY_MS, defaults::RETRY_BASE_DELAY_MS)?,
                ),
                max_delay: Duration::from_millis(defaults::RETRY_MAX_DELAY_MS),
            },
            collaborator_timeout: Duration::from_secs(source.positive(
                env::COLLABORATOR_TIMEOUT_SECS,
                defaults::COLLABORATOR_TIMEOUT_SECS,
            )?),
            api: ApiConfig {
                host: source.string(env::API_HOST, defaults::API_HOST),
                port,
            },
            verbose_logging: source.flag(env::VERBOSE_LOGGING, defaults::VERBOSE_LOGGING)?,
        };

        debug!(
            daemon_mode = config.daemon_mode,
            watch_dir = %config.watch.watch_dir.display(),
            output_dir = %config.watch.output_dir.display(),
            audit_enabled = config.audit.enabled,
            "configuration loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::error::Error;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_audit_disabled() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(lookup(&[("FIREBASE_ENABLED", "false")]))?;
        assert!(config.daemon_mode);
        assert_eq!(config.watch.watch_dir, PathBuf::from("/data/watch"));
        assert_eq!(config.watch.output_dir, PathBuf::from("/data/clean"));
        assert_eq!(config.transfer.remote_name, "gdrive");
        assert_eq!(config.transfer.dest_path, "backups");
        assert!(!config.audit.enabled);
        assert!(!config.verbose_logging);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.watch.poll_interval, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn empty_values_fall_back_to_defaults() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "no"),
            ("WATCH_DIR", ""),
            ("DAEMON_MODE", "  "),
        ]))?;
        assert_eq!(config.watch.watch_dir, PathBuf::from("/data/watch"));
        assert!(config.daemon_mode);
        Ok(())
    }

    #[test]
    fn overrides_are_applied() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "0"),
            ("DAEMON_MODE", "off"),
            ("WATCH_DIR", "/tmp/in"),
            ("OUTPUT_DIR", "/tmp/out"),
            ("RCLONE_REMOTE_NAME", "s3"),
            ("RCLONE_DEST_PATH", "archive"),
            ("VERBOSE_LOGGING", "yes"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("API_PORT", "9000"),
        ]))?;
        assert!(!config.daemon_mode);
        assert_eq!(config.watch.watch_dir, PathBuf::from("/tmp/in"));
        assert_eq!(config.watch.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.transfer,
            TransferConfig {
                remote_name: "s3".into(),
                dest_path: "archive".into(),
            }
        );
        assert!(config.verbose_logging);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.api.port, 9000);
        Ok(())
    }

    #[test]
    fn invalid_boolean_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "false"),
            ("DAEMON_MODE", "sometimes"),
        ]))
        .err();
        assert_eq!(err.map(|err| err.field()), Some("DAEMON_MODE"));
    }

    #[test]
    fn zero_retry_attempts_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "false"),
            ("RETRY_MAX_ATTEMPTS", "0"),
        ]))
        .err();
        assert_eq!(err.map(|err| err.field()), Some("RETRY_MAX_ATTEMPTS"));
    }

    #[test]
    fn enabled_audit_requires_credentials_file() -> Result<(), Box<dyn Error>> {
        let missing = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "true"),
            ("FIREBASE_CREDENTIALS", "/definitely/not/here.json"),
        ]))
        .err();
        assert!(matches!(missing, Some(ConfigError::MissingFile { .. })));

        let file = tempfile::NamedTempFile::new()?;
        let path = file.path().to_string_lossy().into_owned();
        let config = AppConfig::from_lookup(lookup(&[
            ("FIREBASE_ENABLED", "true"),
            ("FIREBASE_CREDENTIALS", path.as_str()),
            ("FIREBASE_ACCESS_TOKEN", "token"),
        ]))?;
        assert!(config.audit.enabled);
        assert_eq!(config.audit.access_token.as_deref(), Some("token"));
        Ok(())
    }
}
