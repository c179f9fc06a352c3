//! Tests for the HTTP directory exporter against a mock directory

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::error::EngineError;
use crate::services::{HttpDirectoryExporter, NoopExporter};
use crate::traits::{DirectoryExporter, DirectoryRecord};

fn record() -> DirectoryRecord {
    DirectoryRecord {
        table: "assignments".to_string(),
        merge_field: "job_id".to_string(),
        fields: json!({ "job_id": "j-1", "provider_id": "p-2" }),
    }
}

#[tokio::test]
async fn test_export_posts_upsert_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/assignments"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({
            "performUpsert": { "fieldsToMergeOn": ["job_id"] },
            "records": [{ "fields": { "job_id": "j-1", "provider_id": "p-2" } }],
            "typecast": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let exporter =
        HttpDirectoryExporter::new(format!("{}/", server.uri()), Some("secret".to_string()), Duration::from_secs(2))
            .unwrap();
    exporter.export(record()).await.unwrap();
}

#[tokio::test]
async fn test_export_reports_directory_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let exporter = HttpDirectoryExporter::new(server.uri(), None, Duration::from_secs(2)).unwrap();
    assert_matches!(exporter.export(record()).await, Err(EngineError::Export { .. }));
}

#[tokio::test]
async fn test_export_gives_up_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let exporter = HttpDirectoryExporter::new(server.uri(), None, Duration::from_millis(100)).unwrap();
    assert_matches!(exporter.export(record()).await, Err(EngineError::Export { .. }));
}

#[tokio::test]
async fn test_noop_exporter_accepts_everything() {
    assert!(NoopExporter.export(record()).await.is_ok());
}
