//! Shared error types for the assignment system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid UUID: {input}")]
    InvalidUuid { input: String },

    #[error("Invalid {kind} status: {value}")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("Illegal {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Unknown log event: {name}")]
    UnknownEvent { name: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Serialization failed: {message}")]
    SerializationError { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
