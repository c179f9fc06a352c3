//! Request handlers
//!
//! - `assign`: broadcast, accept and decline
//! - `admin`: logs, cancellation, sweeping and job snapshots
//! - `providers`: registration, status changes and eligibility lookups

pub mod admin;
pub mod assign;
pub mod providers;

use crate::error::{WebServerError, WebServerResult};

/// A trimmed, non-empty request field
pub(crate) fn required(value: Option<String>, field: &'static str) -> WebServerResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(WebServerError::MissingField { field })
}
