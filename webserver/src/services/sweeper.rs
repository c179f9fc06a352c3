//! Background sweeper for lapsed offers
//!
//! Offers are expired lazily by accept and decline; the sweeper is hygiene so
//! that jobs nobody touches again still reach a terminal state.

use std::sync::Arc;

use engine::{AssignmentService, EngineResult, SweepReport};
use shared::{process_debug, process_info, process_warn, ProcessId};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::state::WebServerState;

pub struct Sweeper<A: AssignmentService> {
    service: Arc<A>,
    state: Arc<WebServerState>,
}

impl<A: AssignmentService> Sweeper<A> {
    pub fn new(service: Arc<A>, state: Arc<WebServerState>) -> Self {
        Self { service, state }
    }

    pub async fn sweep_once(&self) -> EngineResult<SweepReport> {
        let report = self.service.expire_lapsed_offers().await?;
        let count = self.state.record_sweep();
        if report != SweepReport::default() {
            process_info!(
                ProcessId::current(),
                "Sweep #{} expired {} offers and {} jobs",
                count,
                report.offers_expired,
                report.jobs_expired
            );
        }
        Ok(report)
    }

    /// Sweep on the configured interval until `shutdown` flips
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if !self.state.sweeper_enabled() {
            process_debug!(ProcessId::current(), "Sweeper disabled");
            return;
        }

        let mut ticker = tokio::time::interval(self.state.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        process_warn!(ProcessId::current(), "Sweep failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        process_debug!(ProcessId::current(), "Sweeper stopped");
    }
}
