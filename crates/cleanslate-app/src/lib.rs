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
#![allow(clippy::module_name_repetitions)]

//! `CleanSlate` application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring and lifecycle), `error.rs`.

/// Application bootstrap and lifecycle.
pub mod bootstrap;
/// Application error types.
pub mod error;

pub use bootstrap::{AppContext, RunMode, production_deps, run_app, shutdown_on_ctrl_c};
pub use error::{AppError, AppResult};
