//! Shared types for the job assignment system
//!
//! Contains the domain records, status state machines and HTTP message
//! bodies used by both the engine and the web front end, plus the common
//! logging setup.

pub mod errors;
pub mod logging;
pub mod messages;
pub mod types;

pub use errors::*;
pub use types::*;

pub use messages::{
    AcceptResponse, BroadcastRequest, BroadcastResponse, CancelRequest, CancelResponse, ConflictResponse,
    DeclineResponse, EligibleQuery, EligibleResponse, ErrorResponse, LogsQuery, LogsResponse, OfferReplyRequest,
    ProviderRef, ProviderResponse, ProviderStatusRequest, RegisterProviderRequest, SweepResponse,
};
