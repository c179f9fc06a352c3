//! Administrative job transitions
//!
//! Cancel closes an offered job by hand. The sweep expires offers whose hold
//! window has passed so stored state stays tidy; accept and decline do not
//! depend on it because they detect lapsed offers themselves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use shared::{JobId, JobStatus, LogEvent, NewLogEntry, OfferStatus, ProviderId};
use tracing::{info, instrument};

use crate::assignment::{abandon, audit, move_job};
use crate::error::{EngineError, EngineResult};
use crate::traits::{AssignmentStore, Clock, StoreTransaction, SweepReport};

pub struct JobLifecycle<S: AssignmentStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: AssignmentStore, C: Clock> JobLifecycle<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, job_id: JobId, reason: Option<String>) -> EngineResult<Vec<ProviderId>> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        match cancel_in(&mut tx, job_id, reason, now).await {
            Ok(cancelled) => {
                tx.commit().await?;
                Ok(cancelled)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    pub async fn expire_lapsed(&self) -> EngineResult<SweepReport> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        match sweep_in(&mut tx, now).await {
            Ok(report) => {
                tx.commit().await?;
                if report != SweepReport::default() {
                    info!(
                        offers_expired = report.offers_expired,
                        jobs_expired = report.jobs_expired,
                        "Lapsed offers swept"
                    );
                }
                Ok(report)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }
}

async fn cancel_in<T: StoreTransaction>(
    tx: &mut T,
    job_id: JobId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> EngineResult<Vec<ProviderId>> {
    let job = tx
        .find_job(job_id)
        .await?
        .ok_or_else(|| EngineError::not_found("job", job_id))?;
    if job.status != JobStatus::Offered {
        return Err(EngineError::JobNotOpen {
            job_id,
            status: job.status,
        });
    }

    let cancelled = tx.close_open_offers(job_id, None, OfferStatus::Cancelled).await?;
    move_job(tx, job_id, JobStatus::Offered, JobStatus::Cancelled).await?;

    let entry = NewLogEntry::for_job(job_id, LogEvent::JobCancelled, now)
        .with_meta(json!({ "cancelled_providers": cancelled, "reason": reason }));
    audit::record(tx, entry).await?;
    Ok(cancelled)
}

async fn sweep_in<T: StoreTransaction>(tx: &mut T, now: DateTime<Utc>) -> EngineResult<SweepReport> {
    let mut report = SweepReport::default();

    for offer in tx.lapsed_offers(now).await? {
        if tx
            .update_offer_status(offer.job_id, offer.provider_id, OfferStatus::Offered, OfferStatus::Expired)
            .await?
        {
            let entry = NewLogEntry::for_job(offer.job_id, LogEvent::OfferExpired, now)
                .with_provider(offer.provider_id)
                .with_meta(json!({ "source": "sweeper", "expires_at": offer.expires_at }));
            audit::record(tx, entry).await?;
            report.offers_expired += 1;
        }
    }

    for job_id in tx.stranded_jobs().await? {
        move_job(tx, job_id, JobStatus::Offered, JobStatus::Expired).await?;
        let entry = NewLogEntry::for_job(job_id, LogEvent::JobExpired, now).with_meta(json!({ "source": "sweeper" }));
        audit::record(tx, entry).await?;
        report.jobs_expired += 1;
    }

    Ok(report)
}
