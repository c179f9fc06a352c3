//! Test helpers for building engines over an in-memory store

use std::sync::Arc;

use engine::{
    AssignmentEngine, AssignmentService, AssignmentStore, BroadcastCommand, BroadcastOutcome, DirectoryExporter,
    EligibilityPolicy, EngineConfig, ManualClock, MockDirectoryExporter, NewProvider, NoopExporter, SqliteStore,
};
use shared::{JobId, JobSnapshot, LogEvent, OfferStatus, Provider, ProviderId, ProviderStatus};

use super::fixtures::TestFixtures;

pub type TestAssignmentEngine = AssignmentEngine<SqliteStore, ManualClock>;

/// Builder for engines with a controllable clock and optional mock exporter
pub struct EngineBuilder {
    config: EngineConfig,
    exporter: Option<MockDirectoryExporter>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            exporter: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.config = self.config.with_broadcast_policy(policy);
        self
    }

    pub fn with_default_hold(mut self, minutes: u32) -> Self {
        self.config = self.config.with_default_hold(minutes);
        self
    }

    pub fn with_exporter<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockDirectoryExporter),
    {
        let mut mock = MockDirectoryExporter::new();
        setup(&mut mock);
        self.exporter = Some(mock);
        self
    }

    pub async fn build(self) -> TestEngine {
        let store = Arc::new(SqliteStore::in_memory().await.expect("in-memory store"));
        let clock = Arc::new(ManualClock::new(TestFixtures::start()));
        let exporter: Arc<dyn DirectoryExporter> = match self.exporter {
            Some(mock) => Arc::new(mock),
            None => Arc::new(NoopExporter),
        };
        let engine = AssignmentEngine::new(store.clone(), clock.clone(), exporter, self.config).expect("valid config");

        TestEngine {
            engine: Arc::new(engine),
            clock,
            store,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine plus handles on its clock and store
pub struct TestEngine {
    pub engine: Arc<TestAssignmentEngine>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<SqliteStore>,
}

impl TestEngine {
    /// Register a provider covering the standard service and location
    pub async fn provider(&self, name: &str, status: ProviderStatus) -> ProviderId {
        self.provider_at(name, status, TestFixtures::LOCATION).await
    }

    pub async fn provider_at(&self, name: &str, status: ProviderStatus, location: &str) -> ProviderId {
        self.engine
            .register_provider(NewProvider {
                company_name: name.to_string(),
                contact_email: None,
                contact_phone: None,
                status,
                services: vec![TestFixtures::SERVICE.to_string()],
                locations: vec![location.to_string()],
            })
            .await
            .expect("register provider")
            .id
    }

    pub async fn providers(&self, specs: &[(&str, ProviderStatus)]) -> Vec<ProviderId> {
        let mut ids = Vec::with_capacity(specs.len());
        for (name, status) in specs {
            ids.push(self.provider(name, *status).await);
        }
        ids
    }

    /// Broadcast a job for the standard service and location
    pub async fn broadcast(&self) -> BroadcastOutcome {
        self.broadcast_with(None).await
    }

    pub async fn broadcast_with(&self, hold_minutes: Option<i64>) -> BroadcastOutcome {
        let default_hold = self.engine.config().default_hold;
        self.engine
            .broadcast(BroadcastCommand {
                service_code: TestFixtures::SERVICE.to_string(),
                location_code: TestFixtures::LOCATION.to_string(),
                hold_minutes: hold_minutes.map(|m| shared::HoldMinutes::clamp(Some(m), default_hold)),
                metadata: serde_json::json!({ "source": "test" }),
            })
            .await
            .expect("broadcast")
    }

    pub async fn snapshot(&self, job_id: JobId) -> JobSnapshot {
        self.engine.job_snapshot(job_id).await.expect("snapshot")
    }

    pub async fn offer_status(&self, job_id: JobId, provider_id: ProviderId) -> OfferStatus {
        self.snapshot(job_id)
            .await
            .offers
            .into_iter()
            .find(|o| o.provider_id == provider_id)
            .map(|o| o.status)
            .expect("offer exists")
    }

    pub async fn store_provider(&self, provider_id: ProviderId) -> Option<Provider> {
        self.store.find_provider(provider_id).await.expect("find provider")
    }

    /// Log events for a job, oldest first
    pub async fn events(&self, job_id: JobId) -> Vec<LogEvent> {
        self.engine
            .job_history(job_id)
            .await
            .expect("history")
            .into_iter()
            .map(|e| e.event)
            .collect()
    }

    /// The replayed log must always agree with the stored rows
    pub async fn assert_replay_matches(&self, job_id: JobId) {
        let replayed = self.engine.replay(job_id).await.expect("replay");
        let stored = engine::JobProjection::from_snapshot(&self.snapshot(job_id).await);
        assert_eq!(replayed, stored, "log replay diverged from stored state");
    }
}
