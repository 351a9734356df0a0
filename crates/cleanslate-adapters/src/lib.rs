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

//! Production collaborators for the `CleanSlate` pipeline.
//!
//! # Design
//! - `rclone` and `exiftool` are driven as child processes with a bounded
//!   timeout; exit codes are mapped onto transient/fatal collaborator errors.
//! - Audit records go to Firestore over its REST API, or to a disabled sink
//!   that acknowledges every record without storing it.

mod command;
pub mod disabled;
pub mod error;
pub mod exiftool;
pub mod firestore;
pub mod rclone;

pub use disabled::{DISABLED_RECORD_ID, DisabledAuditLog};
pub use error::{AdapterError, AdapterResult};
pub use exiftool::ExiftoolStripper;
pub use firestore::{FirestoreAuditLog, FirestoreConfig};
pub use rclone::RcloneTransfer;
