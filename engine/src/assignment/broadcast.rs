//! Broadcast Coordinator
//!
//! Creates a job and settles it in the same transaction according to how many
//! providers are eligible:
//!
//! - none: the job expires
//! - one: that provider is assigned directly, no offers are written
//! - several: every eligible provider receives a time-bounded offer

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use shared::{Assignment, HoldMinutes, Job, JobStatus, LogEvent, NewLogEntry, Offer, ProviderId};
use tracing::{debug, instrument};

use crate::assignment::{abandon, audit, move_job, resolver};
use crate::config::EngineConfig;
use crate::core::require_code;
use crate::error::{EngineError, EngineResult};
use crate::traits::{AssignmentStore, BroadcastCommand, BroadcastOutcome, ClaimOutcome, Clock, StoreTransaction};

pub struct BroadcastCoordinator<S: AssignmentStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
    config: EngineConfig,
}

impl<S: AssignmentStore, C: Clock> BroadcastCoordinator<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>, config: EngineConfig) -> Self {
        Self { store, clock, config }
    }

    #[instrument(skip(self, command), fields(service_code = %command.service_code, location_code = %command.location_code))]
    pub async fn broadcast(&self, command: BroadcastCommand) -> EngineResult<BroadcastOutcome> {
        let service_code = require_code("service_code", Some(&command.service_code))?;
        let location_code = require_code("location_code", Some(&command.location_code))?;
        let hold = command.hold_minutes.unwrap_or(self.config.default_hold);
        let now = self.clock.now();
        let job = Job::pending(service_code, location_code, now);

        let mut tx = self.store.begin().await?;
        let metadata = merge_meta(command.metadata, Value::Null);
        match self.settle(&mut tx, &job, hold, metadata, now).await {
            Ok(outcome) => {
                tx.commit().await?;
                debug!(job_id = %outcome.job_id, eligible = outcome.eligible_count, "Broadcast committed");
                Ok(outcome)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    async fn settle(
        &self,
        tx: &mut S::Tx,
        job: &Job,
        hold: HoldMinutes,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> EngineResult<BroadcastOutcome> {
        tx.insert_job(job).await?;

        let eligible =
            resolver::resolve_in(tx, &job.service_code, &job.location_code, self.config.broadcast_policy).await?;
        let eligible_count = eligible.len();

        match eligible.as_slice() {
            [] => {
                move_job(tx, job.id, JobStatus::Pending, JobStatus::Expired).await?;
                let entry = NewLogEntry::for_job(job.id, LogEvent::NoEligibleProviders, now).with_meta(metadata);
                audit::record(tx, entry).await?;

                Ok(BroadcastOutcome {
                    job_id: job.id,
                    eligible_count,
                    assigned: None,
                })
            }
            [only] => {
                let assignment = Assignment {
                    job_id: job.id,
                    provider_id: only.id,
                    assigned_at: now,
                };
                if tx.claim_assignment(&assignment).await? == ClaimOutcome::AlreadyClaimed {
                    return Err(EngineError::store(format!("job {} was claimed while being created", job.id)));
                }
                move_job(tx, job.id, JobStatus::Pending, JobStatus::Assigned).await?;
                let entry = NewLogEntry::for_job(job.id, LogEvent::AutoAssignedSingleEligible, now)
                    .with_provider(only.id)
                    .with_meta(metadata);
                audit::record(tx, entry).await?;

                Ok(BroadcastOutcome {
                    job_id: job.id,
                    eligible_count,
                    assigned: Some(assignment),
                })
            }
            many => {
                let mut offered: Vec<ProviderId> = Vec::with_capacity(many.len());
                let mut expires_at = now;
                for provider in many {
                    let offer = Offer::open(job.id, provider.id, now, hold);
                    expires_at = offer.expires_at;
                    // Duplicate (job, provider) rows are skipped, not errors
                    if tx.insert_offer(&offer).await? {
                        offered.push(provider.id);
                    }
                }
                move_job(tx, job.id, JobStatus::Pending, JobStatus::Offered).await?;

                let meta = merge_meta(
                    metadata,
                    json!({
                        "hold_minutes": hold.minutes(),
                        "eligible_count": eligible_count,
                        "providers": offered,
                        "expires_at": expires_at,
                    }),
                );
                let entry = NewLogEntry::for_job(job.id, LogEvent::BroadcastOffersCreated, now).with_meta(meta);
                audit::record(tx, entry).await?;

                Ok(BroadcastOutcome {
                    job_id: job.id,
                    eligible_count,
                    assigned: None,
                })
            }
        }
    }
}

/// Overlay `extra` onto caller metadata; non-object metadata is kept under `metadata`
fn merge_meta(metadata: Value, extra: Value) -> Value {
    let mut merged = match metadata {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("metadata".to_string(), other);
            map
        }
    };
    if let Value::Object(extra) = extra {
        merged.extend(extra);
    }
    Value::Object(merged)
}
