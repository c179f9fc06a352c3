//! Helpers for driving the router without a socket

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use engine::AssignmentService;
use serde_json::Value;
use tower::ServiceExt;
use webserver::WebServer;

use super::fixtures::TestFixtures;

/// Router over `service` with the sweeper disabled
pub fn server_with<A: AssignmentService>(service: A) -> (WebServer<A>, Router) {
    let server = WebServer::new(TestFixtures::bind_address(), Duration::ZERO, Arc::new(service));
    let router = server.build_router();
    (server, router)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Send one request; `body` is sent verbatim as JSON text
pub async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse { status, body }
}
