//! Engine error taxonomy

use shared::{JobId, JobStatus, OfferStatus, ProviderId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Job {job_id} already assigned to provider {winner}")]
    Conflict { job_id: JobId, winner: ProviderId },

    #[error("Offer for job {job_id} expired for provider {provider_id}")]
    Expired { job_id: JobId, provider_id: ProviderId },

    #[error("Offer is {status}")]
    OfferClosed { status: OfferStatus },

    #[error("Job {job_id} is {status}")]
    JobNotOpen { job_id: JobId, status: JobStatus },

    #[error("Store operation failed: {message}")]
    Store { message: String },

    #[error("Directory export failed: {message}")]
    Export { message: String },

    #[error("Configuration error: {field}")]
    Configuration { field: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        EngineError::Store { message: message.into() }
    }

    pub fn config(field: impl Into<String>) -> Self {
        EngineError::Configuration { field: field.into() }
    }

    /// Only store failures are safe to retry: each operation is one
    /// transaction, so a failed attempt leaves nothing behind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Store { .. })
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store { message: err.to_string() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
