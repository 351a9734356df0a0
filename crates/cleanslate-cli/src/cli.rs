//! Argument parsing and command dispatch.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cleanslate_telemetry::LoggingConfig;
use reqwest::Url;

use crate::client::{CliError, CliResult, DEFAULT_TIMEOUT_SECS};
use crate::commands::{
    health::handle_health,
    sanitize::{handle_backup, handle_sanitize},
    serve::{handle_run_api, handle_run_daemon},
};

/// Parses CLI arguments and executes the requested command. Returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    if cli.command.logs() {
        cleanslate_telemetry::init_logging(&LoggingConfig::for_verbosity(cli.verbose))
            .map_err(CliError::failure)?;
    }
    match cli.command {
        Command::Sanitize(args) => handle_sanitize(args).await,
        Command::Backup(args) => handle_backup(args).await,
        Command::RunApi(args) => handle_run_api(args).await,
        Command::RunDaemon(args) => handle_run_daemon(args).await,
        Command::Health(args) => handle_health(args).await,
    }
}

#[derive(Parser)]
#[command(
    name = "cleanslate",
    about = "Strip metadata from files after backing up the originals"
)]
pub(crate) struct Cli {
    /// Enable debug logging.
    #[arg(long, short, global = true, env = "VERBOSE_LOGGING")]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Back up a file, strip its metadata and move it to the output directory.
    Sanitize(SanitizeArgs),
    /// Upload a file to remote storage without modifying it.
    Backup(BackupArgs),
    /// Run the HTTP API.
    RunApi(RunApiArgs),
    /// Run the HTTP API and the directory watcher.
    RunDaemon(RunDaemonArgs),
    /// Check that the service is healthy.
    Health(HealthArgs),
}

impl Command {
    /// Long-running commands install the tracing subscriber; one-shot
    /// commands keep stdout for their own output.
    const fn logs(&self) -> bool {
        matches!(self, Self::RunApi(_) | Self::RunDaemon(_))
    }
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SanitizeArgs {
    /// File to sanitize.
    pub(crate) file: PathBuf,
    /// Show the metadata that would be removed without changing anything.
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Skip the confirmation prompt.
    #[arg(long, short = 'y')]
    pub(crate) confirm: bool,
    /// Print the full metadata before and after instead of only removed fields.
    #[arg(long)]
    pub(crate) show_all_metadata: bool,
    /// Backup destination (`name:path`) overriding the configured remote.
    #[arg(long)]
    pub(crate) remote: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BackupArgs {
    /// File to upload.
    pub(crate) file: PathBuf,
    /// Destination (`name:path`) overriding the configured remote.
    #[arg(long)]
    pub(crate) remote: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunApiArgs {
    /// Interface to bind.
    #[arg(long)]
    pub(crate) host: Option<IpAddr>,
    /// Port to bind.
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunDaemonArgs {
    /// Directory to watch.
    #[arg(long)]
    pub(crate) watch_dir: Option<PathBuf>,
    /// Directory receiving sanitized files.
    #[arg(long)]
    pub(crate) output_dir: Option<PathBuf>,
    /// Default backup destination (`name:path`).
    #[arg(long)]
    pub(crate) remote: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct HealthArgs {
    /// Probe a running API instead of checking locally.
    #[arg(long, env = "CLEANSLATE_API_URL")]
    pub(crate) api_url: Option<Url>,
    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub(crate) timeout: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sanitize_flags_parse() {
        let cli = Cli::try_parse_from([
            "cleanslate",
            "sanitize",
            "photo.jpg",
            "--dry-run",
            "--show-all-metadata",
            "--remote",
            "gdrive:photos",
        ]);
        let Ok(Cli {
            command: Command::Sanitize(args),
            ..
        }) = cli
        else {
            panic!("sanitize command should parse");
        };
        assert_eq!(args.file, PathBuf::from("photo.jpg"));
        assert!(args.dry_run);
        assert!(!args.confirm);
        assert!(args.show_all_metadata);
        assert_eq!(args.remote.as_deref(), Some("gdrive:photos"));
    }

    #[test]
    fn run_api_rejects_non_ip_hosts() {
        assert!(Cli::try_parse_from(["cleanslate", "run-api", "--host", "localhost"]).is_err());
        assert!(
            Cli::try_parse_from(["cleanslate", "run-api", "--host", "127.0.0.1", "--port", "9000"])
                .is_ok()
        );
    }
}
