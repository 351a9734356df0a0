//! Long-running `run-api` and `run-daemon` commands.

use cleanslate_app::{AppContext, RunMode, shutdown_on_ctrl_c};
use cleanslate_config::AppConfig;

use crate::cli::{RunApiArgs, RunDaemonArgs};
use crate::client::{CliResult, load_config};
use crate::commands::sanitize::parse_remote;

pub(crate) async fn handle_run_api(args: RunApiArgs) -> CliResult<()> {
    let mut config = load_config()?;
    apply_api_overrides(&mut config, &args);
    println!(
        "Starting API server on {}:{}",
        config.api.host, config.api.port
    );
    serve(config, RunMode::Api).await
}

pub(crate) async fn handle_run_daemon(args: RunDaemonArgs) -> CliResult<()> {
    let mut config = load_config()?;
    apply_daemon_overrides(&mut config, &args)?;
    println!("Starting daemon...");
    println!("  Watching: {}", config.watch.watch_dir.display());
    println!("  Output:   {}", config.watch.output_dir.display());
    println!(
        "  Remote:   {}:{}",
        config.transfer.remote_name, config.transfer.dest_path
    );
    serve(config, RunMode::Daemon).await
}

fn apply_api_overrides(config: &mut AppConfig, args: &RunApiArgs) {
    if let Some(host) = args.host {
        config.api.host = host.to_string();
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
}

fn apply_daemon_overrides(config: &mut AppConfig, args: &RunDaemonArgs) -> CliResult<()> {
    config.daemon_mode = true;
    if let Some(dir) = &args.watch_dir {
        config.watch.watch_dir.clone_from(dir);
    }
    if let Some(dir) = &args.output_dir {
        config.watch.output_dir.clone_from(dir);
    }
    if let Some(target) = parse_remote(args.remote.as_deref())? {
        config.transfer.remote_name = target.remote_name;
        config.transfer.dest_path = target.remote_path;
    }
    Ok(())
}

async fn serve(config: AppConfig, mode: RunMode) -> CliResult<()> {
    let context = AppContext::from_config(config)?;
    let signal = shutdown_on_ctrl_c(context.trigger());
    let outcome = context.run(mode).await;
    signal.abort();
    Ok(outcome?)
}
