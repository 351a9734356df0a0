//! Child-process execution shared by the CLI-backed adapters.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use cleanslate_core::{CollaboratorError, CollaboratorResult};
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished child process.
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub(crate) code: Option<i32>,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl CommandOutput {
    pub(crate) const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit code label for messages (`signal` when killed).
    pub(crate) fn code_label(&self) -> String {
        self.code
            .map_or_else(|| "signal".to_string(), |code| code.to_string())
    }
}

/// Run `program` with `args`, killing it if it exceeds `limit`.
pub(crate) async fn run<I, S>(
    program: &Path,
    args: I,
    operation: &'static str,
    limit: Duration,
) -> CollaboratorResult<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(program = %program.display(), operation, "spawning collaborator process");

    let output = match tokio::time::timeout(limit, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => return Err(spawn_error(program, operation, &err)),
        Err(_) => return Err(CollaboratorError::timeout(operation, limit)),
    };

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn spawn_error(program: &Path, operation: &'static str, err: &io::Error) -> CollaboratorError {
    let name = program
        .file_name()
        .map_or_else(|| program.display().to_string(), |n| n.to_string_lossy().into_owned());
    match err.kind() {
        io::ErrorKind::NotFound => {
            CollaboratorError::fatal(operation, format!("{name} not found in PATH"))
        }
        io::ErrorKind::PermissionDenied => {
            CollaboratorError::fatal(operation, format!("{name} is not executable"))
        }
        _ => CollaboratorError::transient(operation, format!("failed to spawn {name}: {err}")),
    }
}
