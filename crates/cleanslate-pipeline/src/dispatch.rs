//! Synchronous front door used by the HTTP API and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cleanslate_core::{ProcessOptions, ProcessingResult, RemoteRef, RemoteTarget};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{PipelineStatus, ProcessingPipeline};

/// Caller flags for a sanitize request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Preview only.
    pub dry_run: bool,
    /// The caller already confirmed the run.
    pub confirm: bool,
    /// Backup destination overriding the configured default.
    pub remote: Option<RemoteTarget>,
}

/// Outcome of a standalone backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReceipt {
    /// Local file that was uploaded.
    pub file_path: PathBuf,
    /// Remote copy.
    pub remote_ref: RemoteRef,
    /// Upload attempts spent.
    pub attempts: u32,
    /// Shareable link, when the remote supports one.
    pub share_link: Option<String>,
}

/// Runs one file per call through the shared pipeline.
#[derive(Clone)]
pub struct RequestDispatcher {
    pipeline: Arc<ProcessingPipeline>,
}

impl RequestDispatcher {
    /// Wrap the shared pipeline.
    #[must_use]
    pub const fn new(pipeline: Arc<ProcessingPipeline>) -> Self {
        Self { pipeline }
    }

    /// Underlying pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Arc<ProcessingPipeline> {
        &self.pipeline
    }

    /// Process `path` and attach a share link when a remote copy exists,
    /// including after a partial failure.
    ///
    /// # Errors
    ///
    /// Propagates input errors from [`ProcessingPipeline::process`].
    #[instrument(name = "dispatch.sanitize", skip(self, path, request), fields(path = %path.display(), dry_run = request.dry_run))]
    pub async fn sanitize(
        &self,
        path: &Path,
        request: DispatchRequest,
    ) -> PipelineResult<ProcessingResult> {
        let options = ProcessOptions {
            dry_run: request.dry_run,
            auto_confirm: request.confirm,
            remote_override: request.remote,
        };
        let mut result = self.pipeline.process(path, options).await?;
        if result.share_link.is_none()
            && let Some(remote) = result.remote_ref.clone()
        {
            result.share_link = self.pipeline.share_link(&remote).await;
        }
        Ok(result)
    }

    /// Upload `path` without sanitizing it.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing or when the upload fails
    /// after retries.
    #[instrument(name = "dispatch.backup", skip(self, path, remote), fields(path = %path.display()))]
    pub async fn backup(
        &self,
        path: &Path,
        remote: Option<RemoteTarget>,
    ) -> PipelineResult<BackupReceipt> {
        let stat = tokio::fs::metadata(path)
            .await
            .map_err(|err| PipelineError::from_stat(path, err))?;
        if !stat.is_file() {
            return Err(PipelineError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let target = remote.unwrap_or_else(|| self.pipeline.settings().default_target.clone());
        let (remote_ref, attempts) = self
            .pipeline
            .upload_with_retry(path, &target)
            .await
            .map_err(|(source, attempts)| PipelineError::Backup { attempts, source })?;
        info!(remote = %remote_ref, attempts, "backup stored");
        let share_link = self.pipeline.share_link(&remote_ref).await;
        Ok(BackupReceipt {
            file_path: path.to_path_buf(),
            remote_ref,
            attempts,
            share_link,
        })
    }

    /// Pipeline status snapshot.
    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }
}
