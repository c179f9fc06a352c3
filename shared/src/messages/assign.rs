//! Client ↔ WebServer messages for the assignment endpoints
//!
//! Request bodies keep every field optional so a missing field surfaces as a
//! 400 with a field-specific message instead of a generic decode failure.

use serde::{Deserialize, Serialize};

use crate::types::{DeclineState, JobId, LogEntry, ProviderId};

/// POST /api/assign/broadcast
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BroadcastRequest {
    pub service_code: Option<String>,
    #[serde(alias = "zip")]
    pub location_code: Option<String>,
    /// Any JSON value; only finite numbers are honoured
    pub hold_minutes: Option<serde_json::Value>,
    #[serde(alias = "meta")]
    pub metadata: Option<serde_json::Value>,
}

/// Reference to a provider inside a response body
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderRef {
    pub provider_id: ProviderId,
}

impl From<ProviderId> for ProviderRef {
    fn from(provider_id: ProviderId) -> Self {
        Self { provider_id }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BroadcastResponse {
    pub job_id: JobId,
    pub eligible_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned: Option<ProviderRef>,
}

/// Body shared by accept and decline
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OfferReplyRequest {
    pub job_id: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AcceptResponse {
    pub job_id: JobId,
    pub assigned: ProviderRef,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeclineResponse {
    pub ok: bool,
    pub state: DeclineState,
}

/// 409 body: somebody else already holds the job
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConflictResponse {
    pub ok: bool,
    pub job_id: JobId,
    pub winner: ProviderRef,
}

/// Generic failure body
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// GET /api/assign/admin/logs
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LogsQuery {
    pub job_id: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LogsResponse {
    pub ok: bool,
    pub logs: Vec<LogEntry>,
}

/// POST /api/assign/admin/cancel
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CancelRequest {
    pub job_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CancelResponse {
    pub ok: bool,
    pub job_id: JobId,
    pub cancelled_offers: Vec<ProviderId>,
}

/// POST /api/assign/admin/sweep
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SweepResponse {
    pub ok: bool,
    pub offers_expired: usize,
    pub jobs_expired: usize,
}
