//! Persistent records of the assignment system

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::ids::{JobId, OfferId, ProviderId};
use super::status::{JobStatus, OfferStatus, ProviderStatus};
use crate::errors::SharedError;

/// A service provider with its capabilities and coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: ProviderStatus,
    pub services: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// A provider row as returned by an eligibility query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleProvider {
    pub id: ProviderId,
    pub company_name: String,
    pub status: ProviderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub service_code: String,
    pub location_code: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn pending(service_code: impl Into<String>, location_code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            service_code: service_code.into(),
            location_code: location_code.into(),
            status: JobStatus::Pending,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub job_id: JobId,
    pub provider_id: ProviderId,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn open(job_id: JobId, provider_id: ProviderId, now: DateTime<Utc>, hold: HoldMinutes) -> Self {
        Self {
            id: OfferId::new(),
            job_id,
            provider_id,
            status: OfferStatus::Offered,
            expires_at: now + hold.as_duration(),
            created_at: now,
        }
    }

    /// Lapsed offers are detected lazily: `now >= expires_at`
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The single durable record of which provider won a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub job_id: JobId,
    pub provider_id: ProviderId,
    pub assigned_at: DateTime<Utc>,
}

/// Audit event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    NoEligibleProviders,
    AutoAssignedSingleEligible,
    BroadcastOffersCreated,
    OfferAccepted,
    OfferExpired,
    OfferDeclined,
    OfferDeclineExpired,
    OfferDeclineNoop,
    JobCancelled,
    JobExpired,
    ProviderRegistered,
    ProviderStatusChanged,
}

impl LogEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogEvent::NoEligibleProviders => "no_eligible_providers",
            LogEvent::AutoAssignedSingleEligible => "auto_assigned_single_eligible",
            LogEvent::BroadcastOffersCreated => "broadcast_offers_created",
            LogEvent::OfferAccepted => "offer_accepted",
            LogEvent::OfferExpired => "offer_expired",
            LogEvent::OfferDeclined => "offer_declined",
            LogEvent::OfferDeclineExpired => "offer_decline_expired",
            LogEvent::OfferDeclineNoop => "offer_decline_noop",
            LogEvent::JobCancelled => "job_cancelled",
            LogEvent::JobExpired => "job_expired",
            LogEvent::ProviderRegistered => "provider_registered",
            LogEvent::ProviderStatusChanged => "provider_status_changed",
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogEvent {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| SharedError::UnknownEvent { name: s.to_string() })
    }
}

/// Append-only audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub job_id: Option<JobId>,
    pub provider_id: Option<ProviderId>,
    pub event: LogEvent,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A log entry before the store assigns it an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub job_id: Option<JobId>,
    pub provider_id: Option<ProviderId>,
    pub event: LogEvent,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewLogEntry {
    pub fn for_job(job_id: JobId, event: LogEvent, now: DateTime<Utc>) -> Self {
        Self {
            job_id: Some(job_id),
            provider_id: None,
            event,
            meta: serde_json::Value::Object(Default::default()),
            created_at: now,
        }
    }

    pub fn with_provider(mut self, provider_id: ProviderId) -> Self {
        self.provider_id = Some(provider_id);
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// Everything the store holds about one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job: Job,
    pub offers: Vec<Offer>,
    pub assignment: Option<Assignment>,
}

/// How long an offer stays acceptable, in whole minutes (at least one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldMinutes(u32);

impl HoldMinutes {
    pub const DEFAULT: HoldMinutes = HoldMinutes(15);

    pub fn new(minutes: u32) -> Self {
        Self(minutes.max(1))
    }

    /// Clamp a caller-supplied value; `None` falls back to `default`
    pub fn clamp(requested: Option<i64>, default: HoldMinutes) -> Self {
        match requested {
            Some(minutes) => Self(minutes.clamp(1, u32::MAX as i64) as u32),
            None => default,
        }
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::minutes(self.0 as i64)
    }
}

impl Default for HoldMinutes {
    fn default() -> Self {
        Self::DEFAULT
    }
}
