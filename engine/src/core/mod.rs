//! Core business logic modules
//!
//! Pure functions with no I/O: eligibility ranking and log replay.

pub mod eligibility;
pub mod replay;

pub use eligibility::{normalize_codes, rank_providers, require_code};
pub use replay::JobProjection;
