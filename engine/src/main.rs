//! Admin CLI for the assignment engine
//!
//! Runs single operations against the configured database: schema setup,
//! provider onboarding, broadcasts, offer replies, sweeps and history checks.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use engine::{
    AssignmentEngine, AssignmentService, AssignmentStore, BroadcastCommand, EligibilityPolicy, EngineConfig,
    JobProjection, NewProvider, NoopExporter, SqliteEngine, SqliteStore, SystemClock,
};
use shared::{logging, process_debug, HoldMinutes, JobId, ProcessId, ProviderId, ProviderStatus};

/// Job assignment engine administration
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Administer the job assignment engine")]
pub struct Args {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://assignments.db")]
    pub database_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Default offer hold window in minutes
    #[arg(long, env = "HOLD_MINUTES", default_value = "15")]
    pub hold_minutes: u32,

    /// Eligibility policy for broadcasts (wide, prefer-trusted)
    #[arg(long, env = "BROADCAST_POLICY", default_value = "wide")]
    pub broadcast_policy: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the schema if missing
    Migrate,
    /// Onboard a provider
    RegisterProvider {
        #[arg(long)]
        company_name: String,
        #[arg(long)]
        contact_email: Option<String>,
        #[arg(long)]
        contact_phone: Option<String>,
        #[arg(long, default_value = "pending")]
        status: String,
        /// Service code; repeat for several
        #[arg(long = "service", required = true)]
        services: Vec<String>,
        /// Location code; repeat for several
        #[arg(long = "location", required = true)]
        locations: Vec<String>,
    },
    /// Change a provider's status
    SetStatus { provider_id: String, status: String },
    /// Ranked eligible providers for a service and location
    Eligible {
        #[arg(long)]
        service_code: String,
        #[arg(long)]
        location_code: String,
    },
    /// Create a job and broadcast it
    Broadcast {
        #[arg(long)]
        service_code: String,
        #[arg(long)]
        location_code: String,
        #[arg(long)]
        hold_minutes: Option<i64>,
    },
    /// Accept an offer on behalf of a provider
    Accept { job_id: String, provider_id: String },
    /// Decline an offer on behalf of a provider
    Decline { job_id: String, provider_id: String },
    /// Cancel an offered job
    Cancel {
        job_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Expire lapsed offers
    Sweep,
    /// Print a job's log and check it against the stored state
    History { job_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    ProcessId::init_engine();
    logging::init_tracing_with_level(Some(&args.log_level));
    process_debug!(ProcessId::current(), "Using database {}", args.database_url);

    let engine = build_engine(&args).await?;
    run(&engine, args.command).await
}

async fn build_engine(args: &Args) -> anyhow::Result<SqliteEngine> {
    let policy: EligibilityPolicy = args.broadcast_policy.parse()?;
    let config = EngineConfig::default()
        .with_default_hold(args.hold_minutes)
        .with_broadcast_policy(policy);

    let store = SqliteStore::open(&args.database_url)
        .await
        .with_context(|| format!("opening {}", args.database_url))?;

    // One-shot commands exit before a spawned export could finish, so the CLI never exports
    Ok(AssignmentEngine::new(Arc::new(store), Arc::new(SystemClock), Arc::new(NoopExporter), config)?)
}

async fn run(engine: &SqliteEngine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Migrate => {
            engine.store().migrate().await?;
            logging::log_success(ProcessId::current(), "Schema is up to date");
        }
        Command::RegisterProvider {
            company_name,
            contact_email,
            contact_phone,
            status,
            services,
            locations,
        } => {
            let provider = engine
                .register_provider(NewProvider {
                    company_name,
                    contact_email,
                    contact_phone,
                    status: status.parse()?,
                    services,
                    locations,
                })
                .await?;
            print_json(&provider)?;
        }
        Command::SetStatus { provider_id, status } => {
            let status: ProviderStatus = status.parse()?;
            let provider = engine.set_provider_status(ProviderId::parse(&provider_id)?, status).await?;
            print_json(&provider)?;
        }
        Command::Eligible {
            service_code,
            location_code,
        } => {
            print_json(&engine.eligible_providers(service_code, location_code).await?)?;
        }
        Command::Broadcast {
            service_code,
            location_code,
            hold_minutes,
        } => {
            let outcome = engine
                .broadcast(BroadcastCommand {
                    service_code,
                    location_code,
                    hold_minutes: hold_minutes.map(|m| HoldMinutes::clamp(Some(m), engine.config().default_hold)),
                    metadata: serde_json::json!({ "source": "cli" }),
                })
                .await?;
            print_json(&serde_json::json!({
                "job_id": outcome.job_id,
                "eligible_count": outcome.eligible_count,
                "assigned": outcome.assigned_provider(),
            }))?;
        }
        Command::Accept { job_id, provider_id } => {
            let assignment = engine
                .accept(JobId::parse(&job_id)?, ProviderId::parse(&provider_id)?)
                .await?;
            print_json(&assignment)?;
        }
        Command::Decline { job_id, provider_id } => {
            let state = engine
                .decline(JobId::parse(&job_id)?, ProviderId::parse(&provider_id)?)
                .await?;
            print_json(&serde_json::json!({ "state": state }))?;
        }
        Command::Cancel { job_id, reason } => {
            let cancelled = engine.cancel_job(JobId::parse(&job_id)?, reason).await?;
            print_json(&serde_json::json!({ "cancelled_offers": cancelled }))?;
        }
        Command::Sweep => {
            print_json(&engine.expire_lapsed_offers().await?)?;
        }
        Command::History { job_id } => {
            let job_id = JobId::parse(&job_id)?;
            let history = engine.job_history(job_id).await?;
            print_json(&history)?;

            let replayed = JobProjection::replay(&history)?;
            let stored = JobProjection::from_snapshot(&engine.job_snapshot(job_id).await?);
            if replayed != stored {
                bail!("log replay does not match stored state: replayed {replayed:?}, stored {stored:?}");
            }
            logging::log_success(ProcessId::current(), "Log replay matches stored state");
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
