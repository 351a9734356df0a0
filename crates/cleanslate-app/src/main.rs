#![forbid(unsafe_code)]
#![warn(
    unused,
    dead_code,
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

//! Binary entrypoint that wires the `CleanSlate` services together and runs
//! them until shutdown.

use cleanslate_app::{AppResult, run_app};

/// Bootstraps the application and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
