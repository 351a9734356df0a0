//! In-memory collaborator fakes with call recording and scripted failures.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cleanslate_core::{
    AuditLog, CollaboratorError, CollaboratorResult, MetadataMap, MetadataStripper, RecordId,
    RemoteRef, RemoteTarget, StripOutcome, TransactionRecord, TransferClient,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Upload captured by [`FakeTransfer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    /// Local path handed to the fake.
    pub path: PathBuf,
    /// Destination requested.
    pub target: RemoteTarget,
    /// Bytes of the file at upload time.
    pub bytes: Vec<u8>,
}

/// [`TransferClient`] fake recording uploads and replaying scripted failures.
#[derive(Debug, Default)]
pub struct FakeTransfer {
    attempts: AtomicUsize,
    uploads: Mutex<Vec<RecordedUpload>>,
    failures: Mutex<VecDeque<CollaboratorError>>,
    link_failure: Mutex<Option<CollaboratorError>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeTransfer {
    /// Fake that succeeds on every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next upload attempts with `errors`, in order.
    #[must_use]
    pub fn failing_with(self, errors: impl IntoIterator<Item = CollaboratorError>) -> Self {
        lock(&self.failures).extend(errors);
        self
    }

    /// Fail every share-link request with `error`.
    #[must_use]
    pub fn failing_links(self, error: CollaboratorError) -> Self {
        *lock(&self.link_failure) = Some(error);
        self
    }

    /// Sleep for `delay` inside every upload.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.delay) = Some(delay);
        self
    }

    /// Upload attempts, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successful uploads.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl TransferClient for FakeTransfer {
    async fn upload(&self, local: &Path, target: &RemoteTarget) -> CollaboratorResult<RemoteRef> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = lock(&self.failures).pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        let bytes = std::fs::read(local)
            .map_err(|err| CollaboratorError::fatal("upload", format!("file not found: {err}")))?;
        lock(&self.uploads).push(RecordedUpload {
            path: local.to_path_buf(),
            target: target.clone(),
            bytes,
        });
        Ok(target.object(file_name(local)))
    }

    async fn share_link(&self, remote: &RemoteRef) -> CollaboratorResult<String> {
        if let Some(err) = lock(&self.link_failure).clone() {
            return Err(err);
        }
        Ok(format!(
            "https://share.example/{}/{}",
            remote.remote_name,
            remote.object_path()
        ))
    }
}

/// [`MetadataStripper`] fake keeping metadata per file name.
///
/// Stripping removes every field except those registered as preserved.
#[derive(Debug, Default)]
pub struct FakeStripper {
    metadata: Mutex<HashMap<String, MetadataMap>>,
    preserved: Mutex<Vec<String>>,
    inspect_calls: AtomicUsize,
    strip_calls: AtomicUsize,
    strip_failure: Mutex<Option<CollaboratorError>>,
    inspect_failure: Mutex<Option<CollaboratorError>>,
    delay: Mutex<Option<Duration>>,
    stripped_contents: Mutex<Option<Vec<u8>>>,
}

impl FakeStripper {
    /// Fake reporting empty metadata for unknown files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata reported for files named `name`.
    #[must_use]
    pub fn with_metadata(self, name: &str, metadata: MetadataMap) -> Self {
        lock(&self.metadata).insert(name.to_string(), metadata);
        self
    }

    /// Keep `key` when stripping.
    #[must_use]
    pub fn preserving(self, key: &str) -> Self {
        lock(&self.preserved).push(key.to_string());
        self
    }

    /// Fail every strip with `error`.
    #[must_use]
    pub fn failing_strip(self, error: CollaboratorError) -> Self {
        *lock(&self.strip_failure) = Some(error);
        self
    }

    /// Fail every inspect with `error`.
    #[must_use]
    pub fn failing_inspect(self, error: CollaboratorError) -> Self {
        *lock(&self.inspect_failure) = Some(error);
        self
    }

    /// Sleep for `delay` inside every strip.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.delay) = Some(delay);
        self
    }

    /// Overwrite the file with `contents` on every successful strip.
    #[must_use]
    pub fn rewriting(self, contents: &[u8]) -> Self {
        *lock(&self.stripped_contents) = Some(contents.to_vec());
        self
    }

    /// Number of inspect calls.
    #[must_use]
    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    /// Number of strip calls.
    #[must_use]
    pub fn strip_calls(&self) -> usize {
        self.strip_calls.load(Ordering::SeqCst)
    }

    fn current(&self, path: &Path) -> CollaboratorResult<MetadataMap> {
        if !path.is_file() {
            return Err(CollaboratorError::fatal(
                "inspect",
                format!("file not found: {}", path.display()),
            ));
        }
        Ok(lock(&self.metadata)
            .get(&file_name(path))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MetadataStripper for FakeStripper {
    async fn inspect(&self, path: &Path) -> CollaboratorResult<MetadataMap> {
        self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.inspect_failure).clone() {
            return Err(err);
        }
        self.current(path)
    }

    async fn strip(&self, path: &Path) -> CollaboratorResult<StripOutcome> {
        self.strip_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = lock(&self.strip_failure).clone() {
            return Err(err);
        }
        let before = self.current(path)?;
        let preserved = lock(&self.preserved).clone();
        let after: MetadataMap = before
            .iter()
            .filter(|(key, _)| preserved.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let contents = lock(&self.stripped_contents).clone();
        if let Some(contents) = contents {
            std::fs::write(path, contents)
                .map_err(|err| CollaboratorError::fatal("strip", err.to_string()))?;
        }
        lock(&self.metadata).insert(file_name(path), after.clone());
        Ok(StripOutcome { before, after })
    }
}

/// [`AuditLog`] fake capturing records and replaying scripted failures.
#[derive(Debug, Default)]
pub struct RecordingAuditLog {
    attempts: AtomicUsize,
    records: Mutex<Vec<TransactionRecord>>,
    failures: Mutex<VecDeque<CollaboratorError>>,
}

impl RecordingAuditLog {
    /// Sink that stores every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next writes with `errors`, in order.
    #[must_use]
    pub fn failing_with(self, errors: impl IntoIterator<Item = CollaboratorError>) -> Self {
        lock(&self.failures).extend(errors);
        self
    }

    /// Queue more failures after construction.
    pub fn push_failures(&self, errors: impl IntoIterator<Item = CollaboratorError>) {
        lock(&self.failures).extend(errors);
    }

    /// Write attempts, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Stored records.
    #[must_use]
    pub fn records(&self) -> Vec<TransactionRecord> {
        lock(&self.records).clone()
    }
}

#[async_trait]
impl AuditLog for RecordingAuditLog {
    async fn record(&self, record: &TransactionRecord) -> CollaboratorResult<RecordId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failure = lock(&self.failures).pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        let mut records = lock(&self.records);
        records.push(record.clone());
        Ok(format!("rec-{}", records.len()))
    }
}
