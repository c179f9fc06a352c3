//! Assignment engine façade
//!
//! Wires the components over one store and clock, and sequences the
//! directory export strictly after the transaction that produced an
//! assignment has committed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use shared::{
    process_warn, Assignment, DeclineState, EligibleProvider, JobId, JobSnapshot, LogEntry, ProcessId, Provider,
    ProviderId, ProviderStatus,
};

use crate::assignment::{BroadcastCoordinator, EligibilityResolver, JobLifecycle, OfferResolver};
use crate::config::EngineConfig;
use crate::core::JobProjection;
use crate::error::{EngineError, EngineResult};
use crate::providers::ProviderRegistry;
use crate::traits::{
    AssignmentService, AssignmentStore, BroadcastCommand, BroadcastOutcome, Clock, DirectoryExporter,
    DirectoryRecord, NewProvider, SweepReport,
};

pub struct AssignmentEngine<S: AssignmentStore, C: Clock> {
    store: Arc<S>,
    config: EngineConfig,
    exporter: Arc<dyn DirectoryExporter>,
    resolver: EligibilityResolver<S>,
    coordinator: BroadcastCoordinator<S, C>,
    offers: OfferResolver<S, C>,
    lifecycle: JobLifecycle<S, C>,
    providers: ProviderRegistry<S, C>,
}

impl<S: AssignmentStore, C: Clock> AssignmentEngine<S, C> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<C>,
        exporter: Arc<dyn DirectoryExporter>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;

        Ok(Self {
            resolver: EligibilityResolver::new(store.clone()),
            coordinator: BroadcastCoordinator::new(store.clone(), clock.clone(), config.clone()),
            offers: OfferResolver::new(store.clone(), clock.clone()),
            lifecycle: JobLifecycle::new(store.clone(), clock.clone()),
            providers: ProviderRegistry::new(store.clone(), clock),
            store,
            config,
            exporter,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Full audit trail for a job, oldest first
    pub async fn job_history(&self, job_id: JobId) -> EngineResult<Vec<LogEntry>> {
        self.store.job_history(job_id).await
    }

    /// Rebuild a job's state from its log alone
    pub async fn replay(&self, job_id: JobId) -> EngineResult<JobProjection> {
        let history = self.store.job_history(job_id).await?;
        if history.is_empty() {
            return Err(EngineError::not_found("job", job_id));
        }
        JobProjection::replay(&history)
    }

    /// Fire-and-forget mirror of a committed assignment
    fn export_assignment(&self, assignment: &Assignment) {
        let exporter = self.exporter.clone();
        let record = DirectoryRecord {
            table: "assignments".to_string(),
            merge_field: "job_id".to_string(),
            fields: json!({
                "job_id": assignment.job_id,
                "provider_id": assignment.provider_id,
                "assigned_at": assignment.assigned_at,
            }),
        };

        tokio::spawn(async move {
            if let Err(e) = exporter.export(record).await {
                process_warn!(ProcessId::current(), "Directory export failed: {}", e);
            }
        });
    }
}

#[async_trait]
impl<S: AssignmentStore, C: Clock> AssignmentService for AssignmentEngine<S, C> {
    async fn broadcast(&self, command: BroadcastCommand) -> EngineResult<BroadcastOutcome> {
        let outcome = self.coordinator.broadcast(command).await?;
        if let Some(assignment) = &outcome.assigned {
            self.export_assignment(assignment);
        }
        Ok(outcome)
    }

    async fn accept(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<Assignment> {
        let assignment = self.offers.accept(job_id, provider_id).await?;
        self.export_assignment(&assignment);
        Ok(assignment)
    }

    async fn decline(&self, job_id: JobId, provider_id: ProviderId) -> EngineResult<DeclineState> {
        self.offers.decline(job_id, provider_id).await
    }

    async fn job_logs(&self, job_id: JobId, limit: Option<i64>) -> EngineResult<Vec<LogEntry>> {
        self.store.job_logs(job_id, self.config.log_limit(limit)).await
    }

    async fn job_snapshot(&self, job_id: JobId) -> EngineResult<JobSnapshot> {
        self.store
            .job_snapshot(job_id)
            .await?
            .ok_or_else(|| EngineError::not_found("job", job_id))
    }

    async fn cancel_job(&self, job_id: JobId, reason: Option<String>) -> EngineResult<Vec<ProviderId>> {
        self.lifecycle.cancel(job_id, reason).await
    }

    async fn eligible_providers(&self, service_code: String, location_code: String) -> EngineResult<Vec<EligibleProvider>> {
        self.resolver.resolve(&service_code, &location_code).await
    }

    async fn register_provider(&self, provider: NewProvider) -> EngineResult<Provider> {
        self.providers.register(provider).await
    }

    async fn set_provider_status(&self, provider_id: ProviderId, status: ProviderStatus) -> EngineResult<Provider> {
        self.providers.set_status(provider_id, status).await
    }

    async fn expire_lapsed_offers(&self) -> EngineResult<SweepReport> {
        self.lifecycle.expire_lapsed().await
    }
}
