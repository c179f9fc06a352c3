//! HTTP contract tests against a mocked assignment service

mod common;

use axum::http::{Method, StatusCode};
use common::{send, server_with, TestFixtures};
use engine::{BroadcastOutcome, EngineError, MockAssignmentService, SweepReport};
use mockall::predicate::eq;
use serde_json::json;
use shared::{Assignment, DeclineState, HoldMinutes, JobId, LogEntry, LogEvent, OfferStatus, ProviderId};

fn reply_body(job_id: JobId, provider_id: ProviderId) -> String {
    json!({ "job_id": job_id, "provider_id": provider_id }).to_string()
}

#[tokio::test]
async fn test_broadcast_passes_command_and_reports_auto_assignment() {
    // Arrange
    let job_id = JobId::new();
    let winner = ProviderId::new();
    let mut service = MockAssignmentService::new();
    service
        .expect_broadcast()
        .withf(|command| {
            command.service_code == TestFixtures::SERVICE
                && command.location_code == TestFixtures::LOCATION
                && command.hold_minutes == Some(HoldMinutes::new(7))
                && command.metadata == json!({ "source": "portal" })
        })
        .times(1)
        .returning(move |_| {
            Ok(BroadcastOutcome {
                job_id,
                eligible_count: 1,
                assigned: Some(Assignment {
                    job_id,
                    provider_id: winner,
                    assigned_at: chrono::Utc::now(),
                }),
            })
        });
    let (_, router) = server_with(service);

    // Act
    let body = json!({
        "service_code": " EXIT_SIGN ",
        "zip": "11223",
        "hold_minutes": 7.9,
        "meta": { "source": "portal" }
    })
    .to_string();
    let response = send(&router, Method::POST, "/api/assign/broadcast", Some(&body)).await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["job_id"], json!(job_id));
    assert_eq!(response.body["eligible_count"], 1);
    assert_eq!(response.body["assigned"]["provider_id"], json!(winner));
}

#[tokio::test]
async fn test_broadcast_with_non_numeric_hold_uses_default() {
    // Arrange
    let job_id = JobId::new();
    let mut service = MockAssignmentService::new();
    service
        .expect_broadcast()
        .withf(|command| command.hold_minutes.is_none())
        .times(1)
        .returning(move |_| {
            Ok(BroadcastOutcome {
                job_id,
                eligible_count: 3,
                assigned: None,
            })
        });
    let (_, router) = server_with(service);

    // Act
    let body = json!({
        "service_code": TestFixtures::SERVICE,
        "location_code": TestFixtures::LOCATION,
        "hold_minutes": "15"
    })
    .to_string();
    let response = send(&router, Method::POST, "/api/assign/broadcast", Some(&body)).await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["eligible_count"], 3);
    assert!(response.body.get("assigned").is_none());
}

#[tokio::test]
async fn test_broadcast_without_location_is_bad_request() {
    // Arrange: no expectations, the service must not be called
    let (_, router) = server_with(MockAssignmentService::new());

    // Act
    let response = send(
        &router,
        Method::POST,
        "/api/assign/broadcast",
        Some(r#"{"service_code":"EXIT_SIGN"}"#),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "ok": false, "error": "location_code is required" }));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (_, router) = server_with(MockAssignmentService::new());

    let response = send(&router, Method::POST, "/api/assign/accept", Some("{not json")).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["ok"], false);
}

#[tokio::test]
async fn test_accept_success_names_assigned_provider() {
    // Arrange
    let (job_id, provider_id) = (JobId::new(), ProviderId::new());
    let mut service = MockAssignmentService::new();
    service
        .expect_accept()
        .with(eq(job_id), eq(provider_id))
        .times(1)
        .returning(|job, provider| Ok(TestFixtures::assignment(job, provider)));
    let (_, router) = server_with(service);

    // Act
    let response = send(
        &router,
        Method::POST,
        "/api/assign/accept",
        Some(&reply_body(job_id, provider_id)),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "job_id": job_id, "assigned": { "provider_id": provider_id } })
    );
}

#[tokio::test]
async fn test_accept_conflict_carries_winner() {
    // Arrange
    let (job_id, loser, winner) = (JobId::new(), ProviderId::new(), ProviderId::new());
    let mut service = MockAssignmentService::new();
    service
        .expect_accept()
        .returning(move |job_id, _| Err(EngineError::Conflict { job_id, winner }));
    let (_, router) = server_with(service);

    // Act
    let response = send(&router, Method::POST, "/api/assign/accept", Some(&reply_body(job_id, loser))).await;

    // Assert
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["ok"], false);
    assert_eq!(response.body["winner"]["provider_id"], json!(winner));
}

#[tokio::test]
async fn test_accept_error_statuses() {
    let cases = vec![
        (
            EngineError::Expired {
                job_id: JobId::new(),
                provider_id: ProviderId::new(),
            },
            StatusCode::GONE,
        ),
        (EngineError::not_found("offer", "x"), StatusCode::NOT_FOUND),
        (
            EngineError::OfferClosed {
                status: OfferStatus::Declined,
            },
            StatusCode::NOT_FOUND,
        ),
        (EngineError::store("database is locked"), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        // Arrange
        let mut service = MockAssignmentService::new();
        let message = error.to_string();
        service.expect_accept().return_once(move |_, _| Err(error));
        let (_, router) = server_with(service);

        // Act
        let response = send(
            &router,
            Method::POST,
            "/api/assign/accept",
            Some(&reply_body(JobId::new(), ProviderId::new())),
        )
        .await;

        // Assert
        assert_eq!(response.status, expected);
        assert_eq!(response.body, json!({ "ok": false, "error": message }));
    }
}

#[tokio::test]
async fn test_accept_with_invalid_ids_is_bad_request() {
    let (_, router) = server_with(MockAssignmentService::new());

    let missing = send(&router, Method::POST, "/api/assign/accept", Some(r#"{"job_id":"  "}"#)).await;
    let malformed = send(
        &router,
        Method::POST,
        "/api/assign/accept",
        Some(r#"{"job_id":"nope","provider_id":"also-nope"}"#),
    )
    .await;

    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "job_id is required");
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_decline_reports_state() {
    // Arrange
    let mut service = MockAssignmentService::new();
    service.expect_decline().returning(|_, _| Ok(DeclineState::Noop));
    let (_, router) = server_with(service);

    // Act
    let response = send(
        &router,
        Method::POST,
        "/api/assign/decline",
        Some(&reply_body(JobId::new(), ProviderId::new())),
    )
    .await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "ok": true, "state": "noop" }));
}

#[tokio::test]
async fn test_logs_forward_parsed_limit() {
    // Arrange
    let job_id = JobId::new();
    let entry = LogEntry {
        id: 7,
        job_id: Some(job_id),
        provider_id: None,
        event: LogEvent::BroadcastOffersCreated,
        meta: json!({ "eligible_count": 3 }),
        created_at: TestFixtures::assignment(job_id, ProviderId::new()).assigned_at,
    };
    let mut service = MockAssignmentService::new();
    service
        .expect_job_logs()
        .with(eq(job_id), eq(Some(25)))
        .times(1)
        .returning(move |_, _| Ok(vec![entry.clone()]));
    let (_, router) = server_with(service);

    // Act
    let uri = format!("/api/assign/admin/logs?job_id={job_id}&limit=25");
    let response = send(&router, Method::GET, &uri, None).await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["ok"], true);
    assert_eq!(response.body["logs"][0]["event"], "broadcast_offers_created");
    assert_eq!(response.body["logs"][0]["id"], 7);
}

#[tokio::test]
async fn test_logs_require_job_id() {
    let (_, router) = server_with(MockAssignmentService::new());

    let response = send(&router, Method::GET, "/api/assign/admin/logs?limit=5", None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "job_id is required");
}

#[tokio::test]
async fn test_cancel_on_resolved_job_conflicts() {
    // Arrange
    let job_id = JobId::new();
    let mut service = MockAssignmentService::new();
    service
        .expect_cancel_job()
        .with(eq(job_id), eq(Some("duplicate".to_string())))
        .returning(|job_id, _| {
            Err(EngineError::JobNotOpen {
                job_id,
                status: shared::JobStatus::Assigned,
            })
        });
    let (_, router) = server_with(service);

    // Act
    let body = json!({ "job_id": job_id, "reason": " duplicate " }).to_string();
    let response = send(&router, Method::POST, "/api/assign/admin/cancel", Some(&body)).await;

    // Assert
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["ok"], false);
}

#[tokio::test]
async fn test_sweep_reports_counts() {
    // Arrange
    let mut service = MockAssignmentService::new();
    service.expect_expire_lapsed_offers().times(1).returning(|| {
        Ok(SweepReport {
            offers_expired: 4,
            jobs_expired: 2,
        })
    });
    let (server, router) = server_with(service);

    // Act
    let response = send(&router, Method::POST, "/api/assign/admin/sweep", None).await;

    // Assert
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "ok": true, "offers_expired": 4, "jobs_expired": 2 }));
    assert_eq!(server.state().get_sweeps_completed(), 1);
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let (_, router) = server_with(MockAssignmentService::new());

    let uri = format!("/api/providers/{}/status", ProviderId::new());
    let response = send(&router, Method::POST, &uri, Some(r#"{"status":"suspended"}"#)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_probe_and_health() {
    let (_, router) = server_with(MockAssignmentService::new());

    let probe = send(&router, Method::GET, "/api/assign/accept", None).await;
    let health = send(&router, Method::GET, "/health", None).await;

    assert_eq!(probe.body, json!({ "ok": true, "methods": ["POST"] }));
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(health.body["sweeper_enabled"], false);
}
