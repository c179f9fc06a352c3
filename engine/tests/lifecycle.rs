//! Administrative operations: cancellation, sweeping, logs and providers

mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{EngineBuilder, TestFixtures};
use engine::{AssignmentService, EngineError, NewProvider, SweepReport};
use shared::{JobId, JobStatus, LogEvent, OfferStatus, ProviderId, ProviderStatus};

#[tokio::test]
async fn test_cancel_closes_open_offers() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let ids = t.providers(&TestFixtures::three_providers()).await;
    let job = t.broadcast().await.job_id;
    t.engine.decline(job, ids[2]).await.unwrap();

    // Act
    let mut cancelled = t
        .engine
        .cancel_job(job, Some("customer withdrew".to_string()))
        .await
        .unwrap();

    // Assert
    cancelled.sort();
    let mut expected = vec![ids[0], ids[1]];
    expected.sort();
    assert_eq!(cancelled, expected);
    assert_eq!(t.snapshot(job).await.job.status, JobStatus::Cancelled);
    assert_eq!(t.offer_status(job, ids[0]).await, OfferStatus::Cancelled);
    assert_eq!(t.offer_status(job, ids[2]).await, OfferStatus::Declined);

    let history = t.engine.job_history(job).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.event, LogEvent::JobCancelled);
    assert_eq!(last.meta["reason"], "customer withdrew");
    t.assert_replay_matches(job).await;

    // Offers on a cancelled job are closed, not conflicts
    assert_matches!(
        t.engine.accept(job, ids[0]).await,
        Err(EngineError::OfferClosed { status: OfferStatus::Cancelled })
    );
}

#[tokio::test]
async fn test_cancel_requires_an_offered_job() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    t.provider("Acme Fire Safety", ProviderStatus::Active).await;
    let assigned = t.broadcast().await.job_id;

    // Act
    let resolved = t.engine.cancel_job(assigned, None).await;
    let missing = t.engine.cancel_job(JobId::new(), None).await;

    // Assert
    assert_matches!(resolved, Err(EngineError::JobNotOpen { status: JobStatus::Assigned, .. }));
    assert_matches!(missing, Err(EngineError::NotFound { entity: "job", .. }));
}

#[tokio::test]
async fn test_sweep_expires_lapsed_offers_and_their_jobs() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    t.providers(&TestFixtures::three_providers()).await;
    let lapsing = t.broadcast_with(Some(5)).await.job_id;
    let open = t.broadcast_with(Some(60)).await.job_id;
    t.clock.advance(Duration::minutes(5));

    // Act
    let report = t.engine.expire_lapsed_offers().await.unwrap();
    let again = t.engine.expire_lapsed_offers().await.unwrap();

    // Assert
    assert_eq!(
        report,
        SweepReport {
            offers_expired: 3,
            jobs_expired: 1
        }
    );
    assert_eq!(again, SweepReport::default());
    assert_eq!(t.snapshot(lapsing).await.job.status, JobStatus::Expired);
    assert_eq!(t.snapshot(open).await.job.status, JobStatus::Offered);

    let history = t.engine.job_history(lapsing).await.unwrap();
    assert_eq!(history.last().unwrap().event, LogEvent::JobExpired);
    assert!(history
        .iter()
        .filter(|e| e.event == LogEvent::OfferExpired)
        .all(|e| e.meta["source"] == "sweeper"));
    t.assert_replay_matches(lapsing).await;
}

#[tokio::test]
async fn test_sweep_expires_job_declined_by_everyone() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let ids = t.providers(&TestFixtures::three_providers()).await;
    let job = t.broadcast().await.job_id;
    for id in &ids {
        t.engine.decline(job, *id).await.unwrap();
    }

    // Act
    let report = t.engine.expire_lapsed_offers().await.unwrap();

    // Assert
    assert_eq!(report.offers_expired, 0);
    assert_eq!(report.jobs_expired, 1);
    assert_eq!(t.snapshot(job).await.job.status, JobStatus::Expired);
    t.assert_replay_matches(job).await;
}

#[tokio::test]
async fn test_sweep_leaves_assigned_jobs_alone() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let ids = t.providers(&TestFixtures::three_providers()).await;
    let job = t.broadcast().await.job_id;
    t.engine.accept(job, ids[0]).await.unwrap();
    t.clock.advance(Duration::hours(2));

    // Act
    let report = t.engine.expire_lapsed_offers().await.unwrap();

    // Assert
    assert_eq!(report, SweepReport::default());
    assert_eq!(t.snapshot(job).await.job.status, JobStatus::Assigned);
}

#[tokio::test]
async fn test_job_logs_are_newest_first_and_limited() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let ids = t.providers(&TestFixtures::three_providers()).await;
    let job = t.broadcast().await.job_id;
    t.engine.decline(job, ids[0]).await.unwrap();
    t.engine.decline(job, ids[1]).await.unwrap();

    // Act
    let all = t.engine.job_logs(job, None).await.unwrap();
    let one = t.engine.job_logs(job, Some(1)).await.unwrap();
    let clamped = t.engine.job_logs(job, Some(0)).await.unwrap();

    // Assert
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].event, LogEvent::OfferDeclined);
    assert_eq!(all[0].provider_id, Some(ids[1]));
    assert_eq!(all[2].event, LogEvent::BroadcastOffersCreated);
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].id, all[0].id);
    assert_eq!(clamped.len(), 1);
    assert!(t.engine.job_logs(JobId::new(), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_register_provider_normalizes_codes() {
    // Arrange
    let t = EngineBuilder::new().build().await;

    // Act
    let provider = t
        .engine
        .register_provider(NewProvider {
            company_name: "  Acme Fire Safety ".to_string(),
            contact_email: Some("dispatch@acme.test".to_string()),
            contact_phone: Some("   ".to_string()),
            status: ProviderStatus::Approved,
            services: vec!["EXIT_SIGN".to_string(), " EXIT_SIGN".to_string(), "".to_string()],
            locations: vec!["11223".to_string()],
        })
        .await
        .unwrap();

    // Assert
    assert_eq!(provider.company_name, "Acme Fire Safety");
    assert_eq!(provider.contact_phone, None);
    assert_eq!(provider.services.len(), 1);
    assert_eq!(provider.created_at, TestFixtures::start());
    assert_eq!(t.store_provider(provider.id).await, Some(provider));
}

#[tokio::test]
async fn test_register_provider_requires_services_and_locations() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let request = NewProvider {
        company_name: "Acme Fire Safety".to_string(),
        contact_email: None,
        contact_phone: None,
        status: ProviderStatus::Pending,
        services: vec![],
        locations: vec!["11223".to_string()],
    };

    // Act
    let no_services = t.engine.register_provider(request.clone()).await;
    let no_name = t
        .engine
        .register_provider(NewProvider {
            company_name: " ".to_string(),
            services: vec!["EXIT_SIGN".to_string()],
            ..request
        })
        .await;

    // Assert
    assert_matches!(no_services, Err(EngineError::Validation { field, .. }) if field == "services");
    assert_matches!(no_name, Err(EngineError::Validation { field, .. }) if field == "company_name");
}

#[tokio::test]
async fn test_status_change_moves_provider_between_eligibility_passes() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let pending = t.provider("Cobalt Compliance", ProviderStatus::Pending).await;
    let other = t.provider("Beacon Inspections", ProviderStatus::Pending).await;

    // Act: with nobody trusted, pending providers are the fallback
    let fallback = t
        .engine
        .eligible_providers(TestFixtures::SERVICE.to_string(), TestFixtures::LOCATION.to_string())
        .await
        .unwrap();
    let provider = t.engine.set_provider_status(pending, ProviderStatus::Active).await.unwrap();
    let trusted = t
        .engine
        .eligible_providers(TestFixtures::SERVICE.to_string(), TestFixtures::LOCATION.to_string())
        .await
        .unwrap();

    // Assert
    let fallback_ids: Vec<ProviderId> = fallback.iter().map(|p| p.id).collect();
    assert_eq!(fallback_ids, vec![other, pending]);
    assert_eq!(provider.status, ProviderStatus::Active);
    assert_eq!(trusted.len(), 1);
    assert_eq!(trusted[0].id, pending);
}

#[tokio::test]
async fn test_eligible_providers_are_ranked_by_status_then_name() {
    // Arrange
    let t = EngineBuilder::new().build().await;
    let zed = t.provider("Zed Alarms", ProviderStatus::Active).await;
    let beacon = t.provider("Beacon Inspections", ProviderStatus::Approved).await;
    let acme = t.provider("Acme Fire Safety", ProviderStatus::Active).await;

    // Act
    let ranked = t
        .engine
        .eligible_providers(TestFixtures::SERVICE.to_string(), TestFixtures::LOCATION.to_string())
        .await
        .unwrap();

    // Assert
    let ids: Vec<ProviderId> = ranked.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![acme, zed, beacon]);
}

#[tokio::test]
async fn test_set_status_of_unknown_provider_is_not_found() {
    let t = EngineBuilder::new().build().await;
    assert_matches!(
        t.engine.set_provider_status(ProviderId::new(), ProviderStatus::Active).await,
        Err(EngineError::NotFound { entity: "provider", .. })
    );
}
