//! Tests for the background sweeper

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use engine::{EngineError, MockAssignmentService, SweepReport};
use tokio::sync::watch;

use crate::services::Sweeper;
use crate::state::WebServerState;

fn state(interval: Duration) -> Arc<WebServerState> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    Arc::new(WebServerState::new(addr, interval))
}

#[tokio::test]
async fn test_sweep_once_reports_and_counts() {
    let mut service = MockAssignmentService::new();
    service.expect_expire_lapsed_offers().times(1).returning(|| {
        Ok(SweepReport {
            offers_expired: 2,
            jobs_expired: 1,
        })
    });
    let state = state(Duration::from_secs(60));
    let sweeper = Sweeper::new(Arc::new(service), state.clone());

    let report = sweeper.sweep_once().await.unwrap();

    assert_eq!(report.offers_expired, 2);
    assert_eq!(state.get_sweeps_completed(), 1);
}

#[tokio::test]
async fn test_failed_sweep_is_not_counted() {
    let mut service = MockAssignmentService::new();
    service
        .expect_expire_lapsed_offers()
        .returning(|| Err(EngineError::store("database is locked")));
    let state = state(Duration::from_secs(60));
    let sweeper = Sweeper::new(Arc::new(service), state.clone());

    assert!(sweeper.sweep_once().await.is_err());
    assert_eq!(state.get_sweeps_completed(), 0);
}

#[tokio::test]
async fn test_run_sweeps_until_shutdown() {
    let mut service = MockAssignmentService::new();
    service
        .expect_expire_lapsed_offers()
        .returning(|| Ok(SweepReport::default()));
    let state = state(Duration::from_millis(10));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Sweeper::new(Arc::new(service), state.clone()).run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("sweeper stops on shutdown")
        .unwrap();
    assert!(state.get_sweeps_completed() >= 1);
}

#[tokio::test]
async fn test_disabled_sweeper_returns_immediately() {
    let service = MockAssignmentService::new();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    Sweeper::new(Arc::new(service), state(Duration::ZERO))
        .run(shutdown_rx)
        .await;
}
