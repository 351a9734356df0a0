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

//! HTTP surface for the `CleanSlate` pipeline.
//!
//! # Design
//! - Handlers are thin: they materialise the request, call the shared
//!   [`cleanslate_pipeline::RequestDispatcher`] and translate the result.
//! - Input errors use RFC 9457 problem documents; pipeline failures return the
//!   full sanitize schema with `success=false` and a stage-derived status.
//! - Request ids, tracing spans and per-route metrics wrap every route.

pub mod http;
pub mod models;
pub mod state;

pub use http::router::ApiServer;
pub use state::{ApiState, ServiceSummary};
