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

//! In-process event bus for the `CleanSlate` pipeline.
//!
//! The bus carries typed pipeline events with sequential identifiers and keeps
//! a bounded replay ring so late observers (the `/status` endpoint, tests) can
//! inspect recent history. Delivery uses `tokio::broadcast`; slow subscribers
//! lose the oldest events rather than applying backpressure to the pipeline.

pub mod payloads;
pub mod routing;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId, StageStatus};
pub use routing::{EventBus, EventStream};
