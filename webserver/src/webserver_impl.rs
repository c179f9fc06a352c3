//! Main webserver implementation
//!
//! The `WebServer` owns the assignment service behind its trait, so the HTTP
//! layer can be driven by the real engine or by a mock.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use engine::AssignmentService;
use serde_json::{json, Value};
use shared::{logging, process_info, process_warn, ProcessId};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{WebServerError, WebServerResult};
use crate::services::Sweeper;
use crate::state::WebServerState;
use crate::web::handlers::{admin, assign, providers};

/// Main webserver struct with dependency injection
pub struct WebServer<A: AssignmentService> {
    state: Arc<WebServerState>,
    service: Arc<A>,
}

impl<A: AssignmentService> Clone for WebServer<A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            service: self.service.clone(),
        }
    }
}

impl<A: AssignmentService> WebServer<A> {
    pub fn new(bind_address: SocketAddr, sweep_interval: Duration, service: Arc<A>) -> Self {
        Self {
            state: Arc::new(WebServerState::new(bind_address, sweep_interval)),
            service,
        }
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            // Offer lifecycle
            .route("/api/assign/broadcast", post(assign::broadcast::<A>).get(assign::methods))
            .route("/api/assign/accept", post(assign::accept::<A>).get(assign::methods))
            .route("/api/assign/decline", post(assign::decline::<A>).get(assign::methods))
            // Administration
            .route("/api/assign/admin/logs", get(admin::logs::<A>))
            .route("/api/assign/admin/cancel", post(admin::cancel::<A>))
            .route("/api/assign/admin/sweep", post(admin::sweep::<A>))
            .route("/api/jobs/:job_id", get(admin::job::<A>))
            // Providers
            .route("/api/providers", post(providers::register::<A>))
            .route("/api/providers/eligible", get(providers::eligible::<A>))
            .route("/api/providers/:provider_id/status", post(providers::set_status::<A>))
            .route("/health", get(health_check::<A>))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive())
                    .into_inner(),
            )
            .with_state(self.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.state.bind_address).await.map_err(|e| {
            WebServerError::ServerStartup(format!("Failed to bind to {}: {}", self.state.bind_address, e))
        })?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener, with the sweeper running alongside
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        let (stop_sweeper, sweeper_stopped) = watch::channel(false);
        let sweeper = tokio::spawn(Sweeper::new(self.service.clone(), self.state.clone()).run(sweeper_stopped));

        logging::log_startup(
            ProcessId::current(),
            &format!("Assignment API listening on http://{}", local_addr),
        );
        if self.state.sweeper_enabled() {
            process_info!(
                ProcessId::current(),
                "Sweeping lapsed offers every {:?}",
                self.state.sweep_interval
            );
        }

        let served = axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await;

        self.state.set_running(false);
        let _ = stop_sweeper.send(true);
        if let Err(e) = sweeper.await {
            process_warn!(ProcessId::current(), "Sweeper task ended abnormally: {}", e);
        }

        served.map_err(WebServerError::from)
    }

    pub fn state(&self) -> &Arc<WebServerState> {
        &self.state
    }

    pub fn service(&self) -> &Arc<A> {
        &self.service
    }
}

/// Health check endpoint
async fn health_check<A: AssignmentService>(State(server): State<WebServer<A>>) -> Json<Value> {
    Json(json!({
        "status": if server.state.is_running() { "healthy" } else { "stopping" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": server.state.get_uptime_seconds(),
        "sweeper_enabled": server.state.sweeper_enabled(),
        "sweeps_completed": server.state.get_sweeps_completed(),
    }))
}
