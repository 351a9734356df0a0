//! Metadata inspection and stripping through the `exiftool` CLI.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cleanslate_core::{
    CollaboratorError, CollaboratorResult, MetadataMap, MetadataStripper, StripOutcome,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::command;

/// [`MetadataStripper`] backed by `exiftool`.
///
/// Stripping uses `-overwrite_original`, for which exiftool writes a temporary
/// file and renames it over the source; a failed strip leaves the original
/// bytes in place.
#[derive(Debug, Clone)]
pub struct ExiftoolStripper {
    program: PathBuf,
    timeout: Duration,
    grouped: bool,
}

impl ExiftoolStripper {
    /// Use the `exiftool` binary found on `PATH`, reporting group-prefixed keys.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("exiftool"),
            timeout,
            grouped: true,
        }
    }

    /// Use a specific `exiftool` binary.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Toggle group-prefixed keys (`EXIF:Make` rather than `Make`).
    #[must_use]
    pub const fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }

    fn inspect_args(&self, path: &Path) -> Vec<OsString> {
        let mut args = vec!["-json".into()];
        if self.grouped {
            args.push("-G1".into());
        }
        args.push(path.as_os_str().to_os_string());
        args
    }
}

/// Parse `exiftool -json` output into a metadata map.
fn parse_json_output(stdout: &str) -> Result<MetadataMap, String> {
    let parsed: Value = serde_json::from_str(stdout).map_err(|err| err.to_string())?;
    let Some(Value::Object(first)) = parsed.as_array().and_then(|items| items.first()).cloned()
    else {
        return Err("expected a non-empty JSON array of objects".to_string());
    };
    Ok(first
        .into_iter()
        .filter(|(key, _)| key != "SourceFile")
        .collect())
}

#[async_trait]
impl MetadataStripper for ExiftoolStripper {
    async fn inspect(&self, path: &Path) -> CollaboratorResult<MetadataMap> {
        if !path.is_file() {
            return Err(CollaboratorError::fatal(
                "inspect",
                format!("file not found: {}", path.display()),
            ));
        }
        let output =
            command::run(&self.program, self.inspect_args(path), "inspect", self.timeout).await?;
        if !output.success() {
            return Err(CollaboratorError::fatal(
                "inspect",
                format!(
                    "Metadata read failed (exit code {}): {}",
                    output.code_label(),
                    output.stderr
                ),
            ));
        }
        let metadata = parse_json_output(&output.stdout).map_err(|reason| {
            CollaboratorError::fatal("inspect", format!("Failed to parse metadata: {reason}"))
        })?;
        debug!(file = %path.display(), fields = metadata.len(), "metadata inspected");
        Ok(metadata)
    }

    async fn strip(&self, path: &Path) -> CollaboratorResult<StripOutcome> {
        let before = self.inspect(path).await?;
        let output = command::run(
            &self.program,
            [
                OsStr::new("-all="),
                OsStr::new("-overwrite_original"),
                path.as_os_str(),
            ],
            "strip",
            self.timeout,
        )
        .await?;
        if !output.success() {
            return Err(CollaboratorError::fatal(
                "strip",
                format!(
                    "Metadata strip failed (exit code {}): {}",
                    output.code_label(),
                    output.stderr
                ),
            ));
        }
        let after = self.inspect(path).await?;
        info!(
            file = %path.display(),
            before = before.len(),
            after = after.len(),
            "metadata stripped"
        );
        Ok(StripOutcome { before, after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_drops_source_file() -> Result<(), String> {
        let stdout = r#"[{"SourceFile": "/watch/a.jpg", "EXIF:Make": "Canon", "EXIF:ISO": 200}]"#;
        let metadata = parse_json_output(stdout)?;
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("EXIF:Make"), Some(&json!("Canon")));
        assert_eq!(metadata.get("EXIF:ISO"), Some(&json!(200)));
        assert!(!metadata.contains_key("SourceFile"));
        Ok(())
    }

    #[test]
    fn parse_rejects_unexpected_shapes() {
        assert!(parse_json_output("not json").is_err());
        assert!(parse_json_output("[]").is_err());
        assert!(parse_json_output(r#"{"EXIF:Make": "Canon"}"#).is_err());
    }

    #[test]
    fn inspect_args_respect_grouping() {
        let stripper = ExiftoolStripper::new(Duration::from_secs(1));
        let grouped = stripper.inspect_args(Path::new("a.jpg"));
        assert_eq!(grouped, vec!["-json", "-G1", "a.jpg"]);
        let flat = stripper.grouped(false).inspect_args(Path::new("a.jpg"));
        assert_eq!(flat, vec!["-json", "a.jpg"]);
    }

    #[tokio::test]
    async fn inspect_reports_missing_binary() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("photo.jpg");
        std::fs::write(&file, b"jpeg")?;
        let stripper =
            ExiftoolStripper::new(Duration::from_secs(5)).with_program("cleanslate-no-exiftool");

        let err = stripper.inspect(&file).await.err();
        assert_eq!(
            err.map(|err| err.detail().to_string()),
            Some("cleanslate-no-exiftool not found in PATH".to_string())
        );
        Ok(())
    }
}
