//! WebServer-specific error types and their HTTP mapping

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::EngineError;
use shared::{process_error, ConflictResponse, ErrorResponse, ProcessId, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Invalid request format: {details}")]
    InvalidRequest { details: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Malformed ids and status names in request input
    #[error(transparent)]
    SharedError(#[from] SharedError),

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WebServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebServerError::MissingField { .. }
            | WebServerError::InvalidRequest { .. }
            | WebServerError::SharedError(_) => StatusCode::BAD_REQUEST,
            WebServerError::Engine(engine_error) => match engine_error {
                EngineError::Validation { .. } => StatusCode::BAD_REQUEST,
                EngineError::NotFound { .. } | EngineError::OfferClosed { .. } => StatusCode::NOT_FOUND,
                EngineError::Conflict { .. } | EngineError::JobNotOpen { .. } => StatusCode::CONFLICT,
                EngineError::Expired { .. } => StatusCode::GONE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for WebServerError {
    fn from(rejection: JsonRejection) -> Self {
        WebServerError::InvalidRequest {
            details: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for WebServerError {
    fn from(rejection: QueryRejection) -> Self {
        WebServerError::InvalidRequest {
            details: rejection.body_text(),
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Losing a race is an answer, not a failure: tell the caller who won
        if let WebServerError::Engine(EngineError::Conflict { job_id, winner }) = &self {
            let body = ConflictResponse {
                ok: false,
                job_id: *job_id,
                winner: (*winner).into(),
            };
            return (status, Json(body)).into_response();
        }

        if status.is_server_error() {
            process_error!(ProcessId::current(), "Request failed: {}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
