//! Assignment components
//!
//! Each component runs one operation inside exactly one store transaction:
//! begin, read and write, then commit, or roll back on any error.
//!
//! - `resolver`: eligibility lookups
//! - `broadcast`: job creation and fan-out
//! - `offers`: accept and decline
//! - `lifecycle`: administrative cancel and the lapsed-offer sweep
//! - `audit`: log appends

pub mod audit;
pub mod broadcast;
pub mod lifecycle;
pub mod offers;
pub mod resolver;

pub use broadcast::BroadcastCoordinator;
pub use lifecycle::JobLifecycle;
pub use offers::OfferResolver;
pub use resolver::EligibilityResolver;

use shared::{JobId, JobStatus};
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::traits::StoreTransaction;

/// Roll back after a failure and hand the original error back
pub(crate) async fn abandon<T: StoreTransaction>(tx: T, err: EngineError) -> EngineError {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "Rollback failed after: {}", err);
    }
    err
}

/// Compare-and-set a job's status; a job that moved underneath us is not open
pub(crate) async fn move_job<T: StoreTransaction>(
    tx: &mut T,
    job_id: JobId,
    from: JobStatus,
    to: JobStatus,
) -> EngineResult<()> {
    if tx.update_job_status(job_id, from, to).await? {
        return Ok(());
    }
    let job = tx
        .find_job(job_id)
        .await?
        .ok_or_else(|| EngineError::not_found("job", job_id))?;
    Err(EngineError::JobNotOpen {
        job_id,
        status: job.status,
    })
}
