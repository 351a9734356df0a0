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

//! Environment-driven configuration for `CleanSlate` services.
//!
//! # Design
//! - Every setting comes from a process environment variable with a default.
//! - Loading goes through an injectable lookup so tests never mutate the real
//!   environment.
//! - Validation failures name the offending variable and value.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{ApiConfig, AppConfig, AuditConfig, RetryConfig, TransferConfig, WatchConfig};
