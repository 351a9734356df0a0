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

//! Processing pipeline, directory watcher and request dispatcher.
//!
//! # Design
//! - One [`ProcessingPipeline`] instance is shared by every front end so the
//!   per-identity lock is global.
//! - Stages run in a fixed order (inspect, backup, sanitize, relocate,
//!   audit); the original is never mutated before a remote copy exists.
//! - Stage failures become typed results; `Err` is reserved for input that is
//!   rejected before any side effect.
//! - The watcher owns its [`WatchState`] and is its only writer.

pub mod audit;
pub mod dispatch;
pub mod error;
pub mod health;
mod lock;
mod marker;
pub mod pipeline;
mod relocate;
pub mod retry;
pub mod shutdown;
pub mod watcher;

pub use audit::{AuditQueue, DrainReport};
pub use dispatch::{BackupReceipt, DispatchRequest, RequestDispatcher};
pub use error::{PipelineError, PipelineResult};
pub use health::HealthRegistry;
pub use pipeline::{PipelineDeps, PipelineSettings, PipelineStatus, ProcessingPipeline};
pub use retry::RetryPolicy;
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use watcher::{Classification, DirectoryWatcher, TickReport, WatchState, WatcherSettings};
