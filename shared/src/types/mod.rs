//! Core types used throughout the assignment system

pub mod ids;
pub mod records;
pub mod status;

pub use ids::{JobId, OfferId, ProviderId};
pub use records::{
    Assignment, EligibleProvider, HoldMinutes, Job, JobSnapshot, LogEntry, LogEvent, NewLogEntry, Offer,
    Provider,
};
pub use status::{DeclineState, JobStatus, OfferStatus, ProviderStatus};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Fallback used before a binary has called `init_*` (library use, tests)
static UNINITIALIZED: ProcessId = ProcessId::Engine;

/// Process identifier for any binary in the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Admin CLI and library callers
    Engine,
    /// HTTP front end
    WebServer,
}

impl ProcessId {
    /// Initialize the global process ID for the admin CLI
    pub fn init_engine() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Engine)
    }

    /// Initialize the global process ID for the webserver
    pub fn init_webserver() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::WebServer)
    }

    /// Get the global process ID
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&UNINITIALIZED)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Engine => write!(f, "engine"),
            ProcessId::WebServer => write!(f, "webserver"),
        }
    }
}
