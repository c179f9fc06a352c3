//! Trait definitions for the engine's dependency-injection seams
//!
//! The store traits are implemented by `SqliteStore`; the service, clock and
//! exporter traits carry mockall annotations so the web layer and the engine
//! tests can substitute them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    Assignment, DeclineState, EligibleProvider, HoldMinutes, Job, JobId, JobSnapshot, JobStatus, LogEntry,
    NewLogEntry, Offer, OfferStatus, Provider, ProviderId, ProviderStatus,
};

use crate::error::EngineResult;

/// Result of trying to insert the assignment row for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This transaction inserted the row and is the winner
    Claimed,
    /// A row already exists; the job belongs to someone else
    AlreadyClaimed,
}

/// Transactional access to the assignment tables
///
/// The store only hands out work through transactions; reads that do not
/// need isolation (logs, snapshots) go through the store directly.
#[async_trait::async_trait]
pub trait AssignmentStore: Send + Sync + 'static {
    type Tx: StoreTransaction;

    /// Begin a transaction; every mutating operation runs inside exactly one
    async fn begin(&self) -> EngineResult<Self::Tx>;

    /// Create the schema if it does not exist
    async fn migrate(&self) -> EngineResult<()>;

    async fn find_assignment(&self, job_id: JobId) -> EngineResult<Option<Assignment>>;

    /// Log entries for a job, newest first
    async fn job_logs(&self, job_id: JobId, limit: u32) -> EngineResult<Vec<LogEntry>>;

    /// Log entries for a job, oldest first
    async fn job_history(&self, job_id: JobId) -> EngineResult<Vec<LogEntry>>;

    async fn job_snapshot(&self, job_id: JobId) -> EngineResult<Option<JobSnapshot>>;

    async fn find_provider(&self, provider_id: ProviderId) -> EngineResult<Option<Provider>>;
}

/// A single open store transaction
///
/// Dropping a transaction without committing rolls it back.
#[async_trait::async_trait]
pub trait StoreTransaction: Send + Sized {
    async fn insert_job(&mut self, job: &Job) -> EngineResult<()>;

    async fn find_job(&mut self, job_id: JobId) -> EngineResult<Option<Job>>;

    /// Compare-and-set; returns false when the job was not in `from`
    async fn update_job_status(&mut self, job_id: JobId, from: JobStatus, to: JobStatus) -> EngineResult<bool>;

    /// Providers offering `service_code` in `location_code` whose status is in `statuses`
    async fn eligible_providers(
        &mut self,
        service_code: &str,
        location_code: &str,
        statuses: &[ProviderStatus],
    ) -> EngineResult<Vec<EligibleProvider>>;

    /// Returns false when an offer for the same (job, provider) already exists
    async fn insert_offer(&mut self, offer: &Offer) -> EngineResult<bool>;

    async fn find_offer(&mut self, job_id: JobId, provider_id: ProviderId) -> EngineResult<Option<Offer>>;

    /// Compare-and-set; returns false when the offer was not in `from`
    async fn update_offer_status(
        &mut self,
        job_id: JobId,
        provider_id: ProviderId,
        from: OfferStatus,
        to: OfferStatus,
    ) -> EngineResult<bool>;

    /// Move every still-open offer of a job to `to`, skipping `except`
    async fn close_open_offers(
        &mut self,
        job_id: JobId,
        except: Option<ProviderId>,
        to: OfferStatus,
    ) -> EngineResult<Vec<ProviderId>>;

    /// Open offers whose hold window ended at or before `now`
    async fn lapsed_offers(&mut self, now: DateTime<Utc>) -> EngineResult<Vec<Offer>>;

    /// Offered jobs with no open offer and no assignment
    async fn stranded_jobs(&mut self) -> EngineResult<Vec<JobId>>;

    /// Insert-or-fail on the job key: the only arbiter between concurrent accepts
    async fn claim_assignment(&mut self, assignment: &Assignment) -> EngineResult<ClaimOutcome>;

    async fn find_assignment(&mut self, job_id: JobId) -> EngineResult<Option<Assignment>>;

    async fn append_log(&mut self, entry: &NewLogEntry) -> EngineResult<i64>;

    async fn insert_provider(&mut self, provider: &Provider) -> EngineResult<()>;

    async fn find_provider(&mut self, provider_id: ProviderId) -> EngineResult<Option<Provider>>;

    async fn update_provider_status(&mut self, provider_id: ProviderId, status: ProviderStatus) -> EngineResult<bool>;

    async fn commit(self) -> EngineResult<()>;

    async fn rollback(self) -> EngineResult<()>;
}

/// Source of the current time, injectable so expiry can be tested
#[mockall::automock]
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// A keyed record mirrored into the external contact directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub table: String,
    /// Field the directory upserts on
    pub merge_field: String,
    pub fields: serde_json::Value,
}

/// Outbound mirror of assignment results
///
/// Called only after the owning transaction has committed; a failure here
/// never changes the outcome of the operation that triggered it.
#[mockall::automock]
#[async_trait::async_trait]
pub trait DirectoryExporter: Send + Sync + 'static {
    async fn export(&self, record: DirectoryRecord) -> EngineResult<()>;
}

/// Input for creating and broadcasting a job
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastCommand {
    pub service_code: String,
    pub location_code: String,
    pub hold_minutes: Option<HoldMinutes>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastOutcome {
    pub job_id: JobId,
    pub eligible_count: usize,
    /// The committed assignment when exactly one provider was eligible
    pub assigned: Option<Assignment>,
}

impl BroadcastOutcome {
    pub fn assigned_provider(&self) -> Option<ProviderId> {
        self.assigned.as_ref().map(|a| a.provider_id)
    }
}

/// Input for onboarding a provider
#[derive(Debug, Clone, PartialEq)]
pub struct NewProvider {
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: ProviderStatus,
    pub services: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub offers_expired: usize,
    pub jobs_expired: usize,
}

/// The assignment engine as seen by its callers
#[mockall::automock]
#[async_trait::async_trait]
pub trait AssignmentService: Send + Sync + 'static {
    /// Create a job and resolve it by auto-assignment, offers or expiry
    async fn broadcast(&self, command: BroadcastCommand) -> EngineResult<BroadcastOutcome>;

    /// First committed accept wins; later callers get `Conflict` with the winner
    async fn accept(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<Assignment>;

    async fn decline(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<DeclineState>;

    /// Newest first; `limit` is clamped to the configured maximum
    async fn job_logs(&self, job_id: JobId, limit: Option<i64>) -> EngineResult<Vec<LogEntry>>;

    async fn job_snapshot(&self, job_id: JobId) -> EngineResult<JobSnapshot>;

    /// Cancel an offered job and every offer still open; returns the affected providers
    async fn cancel_job(&self, job_id: JobId, reason: Option<String>) -> EngineResult<Vec<ProviderId>>;

    /// Ranked providers, trusted statuses first, pending only as a fallback
    async fn eligible_providers(&self, service_code: String, location_code: String)
        -> EngineResult<Vec<EligibleProvider>>;

    async fn register_provider(&self, provider: NewProvider) -> EngineResult<Provider>;

    async fn set_provider_status(&self, provider_id: ProviderId, status: ProviderStatus) -> EngineResult<Provider>;

    /// Expire lapsed offers and the jobs they leave without any open offer
    async fn expire_lapsed_offers(&self) -> EngineResult<SweepReport>;
}
