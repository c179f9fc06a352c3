//! Message types exchanged over the HTTP API
//!
//! - `assign`: broadcast, accept, decline and admin job operations
//! - `providers`: provider registration, status changes and eligibility lookups

pub mod assign;
pub mod providers;

pub use assign::{
    AcceptResponse, BroadcastRequest, BroadcastResponse, CancelRequest, CancelResponse, ConflictResponse,
    DeclineResponse, ErrorResponse, LogsQuery, LogsResponse, OfferReplyRequest, ProviderRef, SweepResponse,
};

pub use providers::{EligibleQuery, EligibleResponse, ProviderResponse, ProviderStatusRequest, RegisterProviderRequest};
