//! HTTP routing, handlers and middleware.

/// Shared constants and problem URIs.
pub mod constants;
/// Problem response helpers.
pub mod errors;
/// Health, status and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Sanitize and backup endpoints.
pub mod sanitize;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
