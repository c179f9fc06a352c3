//! WebServer entry point
//!
//! Opens the store, builds the engine and serves the assignment API until
//! Ctrl+C, then drains in-flight requests and stops the sweeper.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use engine::{
    AssignmentEngine, DirectoryExporter, EligibilityPolicy, EngineConfig, HttpDirectoryExporter, NoopExporter,
    SqliteStore, SystemClock,
};
use shared::{logging, process_info, ProcessId};
use tokio::signal;

use webserver::{WebServer, WebServerResult};

#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "HTTP API for the job assignment engine")]
struct Args {
    /// Port for the HTTP server
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://assignments.db")]
    database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Default offer hold window in minutes
    #[arg(long, env = "HOLD_MINUTES", default_value = "15")]
    hold_minutes: u32,

    /// Eligibility policy for broadcasts (wide, prefer-trusted)
    #[arg(long, env = "BROADCAST_POLICY", default_value = "wide")]
    broadcast_policy: String,

    /// Directory export base URL; exports are skipped when unset
    #[arg(long, env = "EXPORT_ENDPOINT")]
    export_endpoint: Option<String>,

    /// Bearer token for the directory export
    #[arg(long, env = "EXPORT_API_KEY", hide_env_values = true)]
    export_api_key: Option<String>,

    /// Directory export timeout in milliseconds (at most 5000)
    #[arg(long, env = "EXPORT_TIMEOUT_MS", default_value = "5000")]
    export_timeout_ms: u64,

    /// Seconds between lapsed-offer sweeps; 0 disables the sweeper
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "60")]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    ProcessId::init_webserver();
    logging::init_tracing_with_level(Some(&args.log_level));

    let policy: EligibilityPolicy = args.broadcast_policy.parse()?;
    let config = EngineConfig::default()
        .with_default_hold(args.hold_minutes)
        .with_broadcast_policy(policy)
        .with_export_timeout(Duration::from_millis(args.export_timeout_ms));

    let exporter: Arc<dyn DirectoryExporter> = match &args.export_endpoint {
        Some(endpoint) => {
            process_info!(ProcessId::current(), "Exporting assignments to {}", endpoint);
            Arc::new(HttpDirectoryExporter::new(
                endpoint.clone(),
                args.export_api_key.clone(),
                config.export_timeout,
            )?)
        }
        None => Arc::new(NoopExporter),
    };

    let store = SqliteStore::open(&args.database_url).await?;
    let engine = AssignmentEngine::new(Arc::new(store), Arc::new(SystemClock), exporter, config)?;

    let bind_address = SocketAddr::new(args.bind, args.port);
    let webserver = WebServer::new(
        bind_address,
        Duration::from_secs(args.sweep_interval_secs),
        Arc::new(engine),
    );

    webserver.run(shutdown_signal()).await?;

    logging::log_success(ProcessId::current(), "WebServer stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
        Err(err) => {
            logging::log_error(ProcessId::current(), "Signal handling", &err);
            // Without a signal handler there is nothing to wait for; keep serving
            std::future::pending::<()>().await;
        }
    }
}

