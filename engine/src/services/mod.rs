//! Service implementations
//!
//! Production implementations of the store, clock and exporter traits.

pub mod clock;
pub mod directory_export;
pub mod sqlite_store;

#[cfg(test)]
mod tests;

pub use clock::{ManualClock, SystemClock};
pub use directory_export::{HttpDirectoryExporter, NoopExporter};
pub use sqlite_store::{SqliteStore, SqliteTransaction};
