//! Audit log appends
//!
//! Entries are written through the caller's transaction so a transition and
//! its log entry commit or vanish together. Each append is mirrored as a
//! tracing event.

use shared::NewLogEntry;
use tracing::info;

use crate::error::EngineResult;
use crate::traits::StoreTransaction;

pub async fn record<T: StoreTransaction>(tx: &mut T, entry: NewLogEntry) -> EngineResult<i64> {
    let log_id = tx.append_log(&entry).await?;
    info!(
        target: "audit",
        log_id,
        event = %entry.event,
        job_id = ?entry.job_id,
        provider_id = ?entry.provider_id,
        meta = %entry.meta,
        "{}",
        entry.event
    );
    Ok(log_id)
}
