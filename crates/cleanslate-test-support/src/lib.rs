//! Shared fakes and fixtures for `CleanSlate` tests.

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeStripper, FakeTransfer, RecordingAuditLog};
pub use fixtures::{camera_metadata, metadata, write_file};
