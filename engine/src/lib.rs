//! Job assignment engine
//!
//! Assigns service jobs to exactly one of many eligible providers. Every
//! mutating operation is a single store transaction, and the uniqueness of
//! the assignment row per job decides which concurrent accept wins.

pub mod assignment;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod providers;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{EligibilityPolicy, EngineConfig};
pub use core::JobProjection;
pub use engine::AssignmentEngine;
pub use error::{EngineError, EngineResult};
pub use services::{HttpDirectoryExporter, ManualClock, NoopExporter, SqliteStore, SystemClock};
pub use traits::{
    AssignmentService, AssignmentStore, BroadcastCommand, BroadcastOutcome, ClaimOutcome, Clock, DirectoryExporter,
    DirectoryRecord, MockAssignmentService, MockDirectoryExporter, NewProvider, StoreTransaction, SweepReport,
};

/// The engine as the binaries run it
pub type SqliteEngine = AssignmentEngine<SqliteStore, SystemClock>;
