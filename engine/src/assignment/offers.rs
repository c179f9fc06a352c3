//! Offer Resolution Service
//!
//! Accept races are settled by the store alone: the assignment row is keyed by
//! job, so of all concurrent accepts exactly one insert lands. Losers roll back,
//! read the row that won and report it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use shared::{Assignment, DeclineState, JobId, JobStatus, LogEvent, NewLogEntry, Offer, OfferStatus, ProviderId};
use tracing::{debug, instrument};

use crate::assignment::{abandon, audit, move_job};
use crate::error::{EngineError, EngineResult};
use crate::traits::{AssignmentStore, ClaimOutcome, Clock, StoreTransaction};

/// What happened inside an accept transaction
enum AcceptStep {
    /// Commit: this caller owns the job
    Won(Assignment),
    /// Commit: the offer was found lapsed and is now expired
    Lapsed,
    /// Roll back: another transaction already holds the assignment row
    Lost,
}

enum DeclineStep {
    Answered(DeclineState),
    Lapsed,
}

pub struct OfferResolver<S: AssignmentStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: AssignmentStore, C: Clock> OfferResolver<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self))]
    pub async fn accept(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<Assignment> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let step = match self.accept_in(&mut tx, job_id, provider_id, now).await {
            Ok(step) => step,
            Err(e) => return Err(abandon(tx, e).await),
        };

        match step {
            AcceptStep::Won(assignment) => {
                tx.commit().await?;
                debug!("Accept won");
                Ok(assignment)
            }
            AcceptStep::Lapsed => {
                tx.commit().await?;
                Err(EngineError::Expired { job_id, provider_id })
            }
            AcceptStep::Lost => {
                tx.rollback().await?;
                let winner = self
                    .store
                    .find_assignment(job_id)
                    .await?
                    .ok_or_else(|| EngineError::store(format!("assignment for job {job_id} vanished after a lost claim")))?;
                debug!(winner = %winner.provider_id, "Accept lost the race");
                Err(EngineError::Conflict {
                    job_id,
                    winner: winner.provider_id,
                })
            }
        }
    }

    async fn accept_in(
        &self,
        tx: &mut S::Tx,
        job_id: JobId,
        provider_id: ProviderId,
        now: DateTime<Utc>,
    ) -> EngineResult<AcceptStep> {
        let offer = load_offer(tx, job_id, provider_id).await?;

        if !offer.status.is_open() {
            // Usually closed by the winner's transaction; name the winner if there is one
            if let Some(existing) = tx.find_assignment(job_id).await? {
                return Err(EngineError::Conflict {
                    job_id,
                    winner: existing.provider_id,
                });
            }
            return Err(EngineError::OfferClosed { status: offer.status });
        }

        if offer.is_lapsed(now) {
            expire_offer(tx, &offer, LogEvent::OfferExpired, now, "accept").await?;
            return Ok(AcceptStep::Lapsed);
        }

        let assignment = Assignment {
            job_id,
            provider_id,
            assigned_at: now,
        };
        if tx.claim_assignment(&assignment).await? == ClaimOutcome::AlreadyClaimed {
            return Ok(AcceptStep::Lost);
        }

        if !tx
            .update_offer_status(job_id, provider_id, OfferStatus::Offered, OfferStatus::Accepted)
            .await?
        {
            return Err(EngineError::store(format!("offer {} changed during accept", offer.id)));
        }
        let expired = tx.close_open_offers(job_id, Some(provider_id), OfferStatus::Expired).await?;
        move_job(tx, job_id, JobStatus::Offered, JobStatus::Assigned).await?;

        let entry = NewLogEntry::for_job(job_id, LogEvent::OfferAccepted, now)
            .with_provider(provider_id)
            .with_meta(json!({ "expired_providers": expired }));
        audit::record(tx, entry).await?;

        Ok(AcceptStep::Won(assignment))
    }

    #[instrument(skip(self))]
    pub async fn decline(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<DeclineState> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        match self.decline_in(&mut tx, job_id, provider_id, now).await {
            Ok(DeclineStep::Answered(state)) => {
                tx.commit().await?;
                Ok(state)
            }
            Ok(DeclineStep::Lapsed) => {
                tx.commit().await?;
                Err(EngineError::Expired { job_id, provider_id })
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    async fn decline_in(
        &self,
        tx: &mut S::Tx,
        job_id: JobId,
        provider_id: ProviderId,
        now: DateTime<Utc>,
    ) -> EngineResult<DeclineStep> {
        // Declines are irrelevant once the job has a winner
        if let Some(existing) = tx.find_assignment(job_id).await? {
            return Err(EngineError::Conflict {
                job_id,
                winner: existing.provider_id,
            });
        }

        let offer = load_offer(tx, job_id, provider_id).await?;

        if offer.is_lapsed(now) {
            expire_offer(tx, &offer, LogEvent::OfferDeclineExpired, now, "decline").await?;
            return Ok(DeclineStep::Lapsed);
        }

        if offer.status.is_open() {
            tx.update_offer_status(job_id, provider_id, OfferStatus::Offered, OfferStatus::Declined)
                .await?;
            let entry = NewLogEntry::for_job(job_id, LogEvent::OfferDeclined, now).with_provider(provider_id);
            audit::record(tx, entry).await?;
            return Ok(DeclineStep::Answered(DeclineState::Declined));
        }

        // Never downgrade a closed offer
        let entry = NewLogEntry::for_job(job_id, LogEvent::OfferDeclineNoop, now)
            .with_provider(provider_id)
            .with_meta(json!({ "status": offer.status }));
        audit::record(tx, entry).await?;
        Ok(DeclineStep::Answered(DeclineState::Noop))
    }
}

async fn load_offer<T: StoreTransaction>(tx: &mut T, job_id: JobId, provider_id: ProviderId) -> EngineResult<Offer> {
    tx.find_offer(job_id, provider_id)
        .await?
        .ok_or_else(|| EngineError::not_found("offer", format!("job {job_id}, provider {provider_id}")))
}

/// Move a lapsed offer to expired; an offer that is already closed keeps its status
async fn expire_offer<T: StoreTransaction>(
    tx: &mut T,
    offer: &Offer,
    event: LogEvent,
    now: DateTime<Utc>,
    source: &str,
) -> EngineResult<()> {
    if offer.status.is_open() {
        tx.update_offer_status(offer.job_id, offer.provider_id, OfferStatus::Offered, OfferStatus::Expired)
            .await?;
    }
    let entry = NewLogEntry::for_job(offer.job_id, event, now)
        .with_provider(offer.provider_id)
        .with_meta(json!({ "source": source, "expires_at": offer.expires_at }));
    audit::record(tx, entry).await?;
    Ok(())
}
