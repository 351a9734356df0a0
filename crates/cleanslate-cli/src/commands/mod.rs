//! Command handlers grouped by concern.

pub(crate) mod health;
pub(crate) mod sanitize;
pub(crate) mod serve;
