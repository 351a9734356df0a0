//! Local `sanitize` and `backup` commands.

use std::io::{self, BufRead, BufReader, Write};

use anyhow::anyhow;
use cleanslate_app::AppContext;
use cleanslate_core::{ProcessingResult, RemoteTarget};
use cleanslate_pipeline::{DispatchRequest, PipelineError, RequestDispatcher};

use crate::cli::{BackupArgs, SanitizeArgs};
use crate::client::{CliError, CliResult, load_config};
use crate::output::{render_backup, render_failure, render_preview, render_sanitized};

pub(crate) async fn handle_sanitize(args: SanitizeArgs) -> CliResult<()> {
    let context = AppContext::from_config(load_config()?)?;
    let mut input = BufReader::new(io::stdin());
    let mut output = io::stdout();
    sanitize_with(&context.dispatcher(), &args, &mut input, &mut output).await
}

pub(crate) async fn handle_backup(args: BackupArgs) -> CliResult<()> {
    let context = AppContext::from_config(load_config()?)?;
    let rendered = backup_with(&context.dispatcher(), &args).await?;
    print!("{rendered}");
    Ok(())
}

pub(crate) fn parse_remote(raw: Option<&str>) -> CliResult<Option<RemoteTarget>> {
    raw.map(str::parse::<RemoteTarget>)
        .transpose()
        .map_err(|err| CliError::from(PipelineError::from(err)))
}

/// Preview, confirm, then sanitize `args.file`.
///
/// `--dry-run` stops after the preview; `--confirm` skips the prompt.
pub(crate) async fn sanitize_with<R, W>(
    dispatcher: &RequestDispatcher,
    args: &SanitizeArgs,
    input: &mut R,
    output: &mut W,
) -> CliResult<()>
where
    R: BufRead,
    W: Write,
{
    let remote = parse_remote(args.remote.as_deref())?;
    if args.dry_run || !args.confirm {
        let preview = dispatcher
            .sanitize(
                &args.file,
                DispatchRequest {
                    dry_run: true,
                    confirm: false,
                    remote: remote.clone(),
                },
            )
            .await?;
        if !preview.success {
            return fail(&preview, output);
        }
        emit(output, &render_preview(&preview, args.show_all_metadata))?;
        if args.dry_run {
            return Ok(());
        }
        if !prompt(input, output)? {
            emit(output, "Cancelled\n")?;
            return Ok(());
        }
    }

    let result = dispatcher
        .sanitize(
            &args.file,
            DispatchRequest {
                dry_run: false,
                confirm: true,
                remote,
            },
        )
        .await?;
    flush_audit(dispatcher, output).await?;
    if !result.success {
        return fail(&result, output);
    }
    emit(output, &render_sanitized(&result, args.show_all_metadata))
}

/// Redeliver queued audit records before the process exits.
async fn flush_audit<W: Write>(dispatcher: &RequestDispatcher, output: &mut W) -> CliResult<()> {
    let queue = dispatcher.pipeline().audit_queue();
    if queue.depth() == 0 {
        return Ok(());
    }
    let policy = dispatcher.pipeline().settings().retry;
    let mut report = queue.drain().await;
    for attempt in 1..policy.max_attempts {
        if report.remaining == 0 {
            break;
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
        report = queue.drain().await;
    }
    if report.remaining > 0 {
        emit(
            output,
            &format!(
                "Warning: {} audit record(s) could not be delivered\n",
                report.remaining
            ),
        )?;
    }
    Ok(())
}

pub(crate) async fn backup_with(
    dispatcher: &RequestDispatcher,
    args: &BackupArgs,
) -> CliResult<String> {
    let remote = parse_remote(args.remote.as_deref())?;
    let receipt = dispatcher.backup(&args.file, remote).await?;
    Ok(render_backup(&receipt))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> CliResult<bool> {
    emit(output, "Proceed? [y/N] ")?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|err| CliError::failure(anyhow!("failed to read confirmation: {err}")))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn fail<W: Write>(result: &ProcessingResult, output: &mut W) -> CliResult<()> {
    emit(output, &render_failure(result))?;
    let message = result
        .failure
        .as_ref()
        .map_or_else(|| "sanitization failed".to_string(), |f| f.message.clone());
    Err(CliError::failure(anyhow!(message)))
}

fn emit<W: Write>(output: &mut W, text: &str) -> CliResult<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|()| output.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Arc;

    use cleanslate_config::AppConfig;
    use cleanslate_core::CollaboratorError;
    use cleanslate_pipeline::PipelineDeps;
    use cleanslate_test_support::{
        FakeStripper, FakeTransfer, RecordingAuditLog, fixtures::camera_metadata,
        fixtures::write_file,
    };
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        transfer: Arc<FakeTransfer>,
        audit: Arc<RecordingAuditLog>,
        context: AppContext,
    }

    impl Fixture {
        fn new(transfer: FakeTransfer) -> anyhow::Result<Self> {
            Self::with_audit(transfer, RecordingAuditLog::new())
        }

        fn with_audit(transfer: FakeTransfer, audit: RecordingAuditLog) -> anyhow::Result<Self> {
            let root = tempfile::tempdir()?;
            let base = root.path().display().to_string();
            let config = AppConfig::from_lookup(|key| match key {
                "WATCH_DIR" => Some(format!("{base}/watch")),
                "OUTPUT_DIR" => Some(format!("{base}/clean")),
                "FIREBASE_ENABLED" => Some("false".into()),
                "RETRY_MAX_ATTEMPTS" => Some("1".into()),
                _ => None,
            })?;
            let transfer = Arc::new(transfer);
            let audit = Arc::new(audit);
            let context = AppContext::with_deps(
                config,
                PipelineDeps {
                    transfer: transfer.clone(),
                    stripper: Arc::new(
                        FakeStripper::new().with_metadata("photo.jpg", camera_metadata()),
                    ),
                    audit: audit.clone(),
                },
            )?;
            Ok(Self {
                root,
                transfer,
                audit,
                context,
            })
        }

        fn photo(&self) -> anyhow::Result<PathBuf> {
            Ok(write_file(self.root.path(), "photo.jpg", b"jpeg")?)
        }

        fn args(&self, file: PathBuf) -> SanitizeArgs {
            SanitizeArgs {
                file,
                dry_run: false,
                confirm: false,
                show_all_metadata: false,
                remote: None,
            }
        }
    }

    async fn run(fixture: &Fixture, args: &SanitizeArgs, answer: &str) -> (CliResult<()>, String) {
        let mut input = Cursor::new(answer.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = sanitize_with(
            &fixture.context.dispatcher(),
            args,
            &mut input,
            &mut output,
        )
        .await;
        (result, String::from_utf8_lossy(&output).into_owned())
    }

    #[tokio::test]
    async fn dry_run_previews_without_prompting() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let mut args = fixture.args(fixture.photo()?);
        args.dry_run = true;
        let (result, output) = run(&fixture, &args, "").await;
        assert!(result.is_ok());
        assert!(output.contains("Metadata preview"));
        assert!(output.contains("EXIF:Make"));
        assert!(!output.contains("Proceed?"));
        assert!(fixture.transfer.uploads().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn declined_prompt_leaves_file_untouched() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let photo = fixture.photo()?;
        let (result, output) = run(&fixture, &fixture.args(photo.clone()), "n\n").await;
        assert!(result.is_ok());
        assert!(output.contains("Proceed? [y/N]"));
        assert!(output.contains("Cancelled"));
        assert!(photo.is_file());
        assert!(fixture.transfer.uploads().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn accepted_prompt_sanitizes() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let (result, output) = run(&fixture, &fixture.args(fixture.photo()?), "y\n").await;
        assert!(result.is_ok(), "{output}");
        assert!(output.contains("✓ Sanitized successfully"));
        assert!(output.contains("EXIF:Make: Canon -> (removed)"));
        assert!(fixture.root.path().join("clean/photo.jpg").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn confirmed_run_with_full_metadata_skips_prompt() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let mut args = fixture.args(fixture.photo()?);
        args.confirm = true;
        args.show_all_metadata = true;
        let (result, output) = run(&fixture, &args, "").await;
        assert!(result.is_ok(), "{output}");
        assert!(!output.contains("Proceed?"));
        assert!(output.contains("Metadata before (2):"));
        assert!(output.contains("Metadata after (0):"));
        Ok(())
    }

    #[tokio::test]
    async fn queued_audit_record_is_delivered_before_exit() -> anyhow::Result<()> {
        let fixture = Fixture::with_audit(
            FakeTransfer::new(),
            RecordingAuditLog::new()
                .failing_with([CollaboratorError::transient("audit", "firestore unavailable")]),
        )?;
        let mut args = fixture.args(fixture.photo()?);
        args.confirm = true;
        let (result, output) = run(&fixture, &args, "").await;
        assert!(result.is_ok(), "{output}");
        assert_eq!(fixture.audit.records().len(), 1);
        assert_eq!(fixture.context.pipeline().audit_queue().depth(), 0);
        assert!(!output.contains("Warning"));
        Ok(())
    }

    #[tokio::test]
    async fn undeliverable_audit_record_is_reported() -> anyhow::Result<()> {
        let fixture = Fixture::with_audit(
            FakeTransfer::new(),
            RecordingAuditLog::new().failing_with([
                CollaboratorError::transient("audit", "firestore unavailable"),
                CollaboratorError::transient("audit", "firestore unavailable"),
            ]),
        )?;
        let mut args = fixture.args(fixture.photo()?);
        args.confirm = true;
        let (result, output) = run(&fixture, &args, "").await;
        assert!(result.is_ok(), "{output}");
        assert!(output.contains("Warning: 1 audit record(s) could not be delivered"));
        assert!(fixture.audit.records().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_file_is_a_validation_error() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let notes = write_file(fixture.root.path(), "notes.txt", b"hi")?;
        let mut args = fixture.args(notes);
        args.confirm = true;
        let (result, _) = run(&fixture, &args, "").await;
        assert!(matches!(result, Err(ref err) if err.exit_code() == 2));
        Ok(())
    }

    #[tokio::test]
    async fn backup_failure_reports_stage_and_exits_with_runtime_code() -> anyhow::Result<()> {
        let fixture = Fixture::new(
            FakeTransfer::new().failing_with([CollaboratorError::fatal("upload", "bad remote")]),
        )?;
        let mut args = fixture.args(fixture.photo()?);
        args.confirm = true;
        let (result, output) = run(&fixture, &args, "").await;
        assert!(matches!(result, Err(ref err) if err.exit_code() == 3));
        assert!(output.contains("Stage: backup"));
        Ok(())
    }

    #[tokio::test]
    async fn backup_command_reports_remote() -> anyhow::Result<()> {
        let fixture = Fixture::new(FakeTransfer::new())?;
        let notes = write_file(fixture.root.path(), "notes.txt", b"hi")?;
        let rendered = backup_with(
            &fixture.context.dispatcher(),
            &BackupArgs {
                file: notes,
                remote: Some("gdrive:archive".into()),
            },
        )
        .await?;
        assert!(rendered.starts_with("Backup successful"));
        assert!(rendered.contains("gdrive:archive"));
        Ok(())
    }

    #[test]
    fn invalid_remote_is_rejected() {
        assert!(matches!(parse_remote(Some("nocolon")), Err(ref err) if err.exit_code() == 2));
        assert!(matches!(parse_remote(None), Ok(None)));
    }
}
