//! Remote backup through the `rclone` CLI.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cleanslate_core::{
    CollaboratorError, CollaboratorResult, RemoteRef, RemoteTarget, TransferClient,
};
use tracing::{info, warn};

use crate::command::{self, CommandOutput};

/// [`TransferClient`] backed by `rclone copy` and `rclone link`.
#[derive(Debug, Clone)]
pub struct RcloneTransfer {
    program: PathBuf,
    timeout: Duration,
}

impl RcloneTransfer {
    /// Use the `rclone` binary found on `PATH`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("rclone"),
            timeout,
        }
    }

    /// Use a specific `rclone` binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

/// Map an rclone exit status onto the collaborator taxonomy.
///
/// rclone documents 5 as a temporary error and 8 as an exceeded transfer
/// quota; 2 and 6 are generic runtime errors worth another attempt. Usage
/// errors, missing files or directories and fatal errors are not retried.
fn classify_exit(operation: &'static str, output: &CommandOutput) -> CollaboratorError {
    let detail = format!(
        "rclone exited with code {}: {}",
        output.code_label(),
        output.stderr
    );
    match output.code {
        Some(2 | 5 | 6 | 8) | None => CollaboratorError::transient(operation, detail),
        _ => CollaboratorError::fatal(operation, detail),
    }
}

#[async_trait]
impl TransferClient for RcloneTransfer {
    async fn upload(&self, local: &Path, target: &RemoteTarget) -> CollaboratorResult<RemoteRef> {
        if !local.is_file() {
            return Err(CollaboratorError::fatal(
                "upload",
                format!("file not found: {}", local.display()),
            ));
        }
        let Some(file_name) = local.file_name().map(|name| name.to_string_lossy().into_owned())
        else {
            return Err(CollaboratorError::fatal("upload", "path has no file name"));
        };

        let destination = target.to_string();
        let output = command::run(
            &self.program,
            [OsStr::new("copy"), local.as_os_str(), OsStr::new(&destination)],
            "upload",
            self.timeout,
        )
        .await?;
        if !output.success() {
            let err = classify_exit("upload", &output);
            warn!(
                file = %local.display(),
                destination = %destination,
                transient = err.is_transient(),
                detail = err.detail(),
                "rclone copy failed"
            );
            return Err(err);
        }

        let remote = target.object(file_name);
        info!(file = %local.display(), remote = %remote, "backup uploaded");
        Ok(remote)
    }

    async fn share_link(&self, remote: &RemoteRef) -> CollaboratorResult<String> {
        let object = remote.to_string();
        let output =
            command::run(&self.program, ["link", object.as_str()], "share_link", self.timeout)
                .await?;
        if !output.success() {
            return Err(classify_exit("share_link", &output));
        }
        let link = output.stdout.trim();
        if link.is_empty() {
            return Err(CollaboratorError::fatal(
                "share_link",
                format!("rclone returned no link for {object}"),
            ));
        }
        Ok(link.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: Option<i32>) -> CommandOutput {
        CommandOutput {
            code,
            stdout: String::new(),
            stderr: "boom".into(),
        }
    }

    #[test]
    fn exit_codes_are_classified() {
        for code in [Some(2), Some(5), Some(6), Some(8), None] {
            assert!(classify_exit("upload", &output(code)).is_transient());
        }
        for code in [1, 3, 4, 7, 9] {
            assert!(!classify_exit("upload", &output(Some(code))).is_transient());
        }
        assert_eq!(
            classify_exit("upload", &output(Some(7))).detail(),
            "rclone exited with code 7: boom"
        );
    }

    #[tokio::test]
    async fn upload_rejects_missing_and_directory_paths() -> std::io::Result<()> {
        let transfer = RcloneTransfer::new(Duration::from_secs(5));
        let target = RemoteTarget::new("gdrive", "backups");
        let dir = tempfile::tempdir()?;

        let missing = transfer
            .upload(&dir.path().join("missing.jpg"), &target)
            .await
            .err();
        assert!(missing.is_some_and(|err| !err.is_transient()));

        let directory = transfer.upload(dir.path(), &target).await.err();
        assert!(directory.is_some_and(|err| err.detail().starts_with("file not found")));
        Ok(())
    }

    #[tokio::test]
    async fn missing_binary_is_fatal() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("photo.jpg");
        std::fs::write(&file, b"jpeg")?;
        let transfer = RcloneTransfer::new(Duration::from_secs(5))
            .with_program(dir.path().join("no-rclone-here"));

        let err = transfer
            .upload(&file, &RemoteTarget::new("gdrive", "backups"))
            .await
            .err();
        assert_eq!(
            err,
            Some(CollaboratorError::fatal(
                "upload",
                "no-rclone-here not found in PATH"
            ))
        );
        Ok(())
    }
}
