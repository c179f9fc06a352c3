//! Rebuild a job's state from its audit log
//!
//! Every job and offer transition is logged in the same transaction that
//! performs it, so folding the log in id order must land on exactly the state
//! the store holds.

use std::collections::BTreeMap;

use shared::{JobSnapshot, JobStatus, LogEntry, LogEvent, OfferStatus, ProviderId};

use crate::error::{EngineError, EngineResult};

/// Job, offer and assignment state, comparable between log and store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProjection {
    pub status: JobStatus,
    pub offers: BTreeMap<ProviderId, OfferStatus>,
    pub winner: Option<ProviderId>,
}

impl Default for JobProjection {
    fn default() -> Self {
        Self {
            status: JobStatus::Pending,
            offers: BTreeMap::new(),
            winner: None,
        }
    }
}

impl JobProjection {
    pub fn from_snapshot(snapshot: &JobSnapshot) -> Self {
        Self {
            status: snapshot.job.status,
            offers: snapshot
                .offers
                .iter()
                .map(|offer| (offer.provider_id, offer.status))
                .collect(),
            winner: snapshot.assignment.as_ref().map(|a| a.provider_id),
        }
    }

    /// Fold `entries` (oldest first) into a projection
    pub fn replay<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> EngineResult<Self> {
        let mut projection = Self::default();
        for entry in entries {
            projection.apply(entry)?;
        }
        Ok(projection)
    }

    pub fn apply(&mut self, entry: &LogEntry) -> EngineResult<()> {
        match entry.event {
            LogEvent::NoEligibleProviders | LogEvent::JobExpired => {
                self.move_job(JobStatus::Expired)?;
            }
            LogEvent::AutoAssignedSingleEligible => {
                let provider = provider_of(entry)?;
                self.move_job(JobStatus::Assigned)?;
                self.winner = Some(provider);
            }
            LogEvent::BroadcastOffersCreated => {
                for provider in providers_in(entry, "providers")? {
                    self.offers.insert(provider, OfferStatus::Offered);
                }
                self.move_job(JobStatus::Offered)?;
            }
            LogEvent::OfferAccepted => {
                let provider = provider_of(entry)?;
                self.move_offer(provider, OfferStatus::Accepted)?;
                self.close_others(Some(provider), OfferStatus::Expired);
                self.move_job(JobStatus::Assigned)?;
                self.winner = Some(provider);
            }
            LogEvent::OfferExpired | LogEvent::OfferDeclineExpired => {
                let provider = provider_of(entry)?;
                // A lapsed offer that a concurrent winner already closed stays closed
                if self.offers.get(&provider).is_some_and(|status| status.is_open()) {
                    self.move_offer(provider, OfferStatus::Expired)?;
                }
            }
            LogEvent::OfferDeclined => {
                let provider = provider_of(entry)?;
                self.move_offer(provider, OfferStatus::Declined)?;
            }
            LogEvent::JobCancelled => {
                self.close_others(None, OfferStatus::Cancelled);
                self.move_job(JobStatus::Cancelled)?;
            }
            LogEvent::OfferDeclineNoop | LogEvent::ProviderRegistered | LogEvent::ProviderStatusChanged => {}
        }
        Ok(())
    }

    fn move_job(&mut self, to: JobStatus) -> EngineResult<()> {
        self.status = self.status.transition_to(to)?;
        Ok(())
    }

    fn move_offer(&mut self, provider: ProviderId, to: OfferStatus) -> EngineResult<()> {
        let current = self
            .offers
            .get_mut(&provider)
            .ok_or_else(|| EngineError::not_found("offer", provider))?;
        *current = current.transition_to(to)?;
        Ok(())
    }

    fn close_others(&mut self, except: Option<ProviderId>, to: OfferStatus) {
        for (provider, status) in self.offers.iter_mut() {
            if Some(*provider) != except && status.is_open() {
                *status = to;
            }
        }
    }
}

fn provider_of(entry: &LogEntry) -> EngineResult<ProviderId> {
    entry
        .provider_id
        .ok_or_else(|| EngineError::validation("provider_id", format!("{} entry {} has no provider", entry.event, entry.id)))
}

fn providers_in(entry: &LogEntry, key: &str) -> EngineResult<Vec<ProviderId>> {
    let value = entry.meta.get(key).cloned().unwrap_or(serde_json::Value::Array(Vec::new()));
    Ok(serde_json::from_value(value)?)
}
