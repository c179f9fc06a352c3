//! Administrative endpoints

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use engine::AssignmentService;
use shared::{CancelRequest, CancelResponse, JobId, JobSnapshot, LogsQuery, LogsResponse, SweepResponse};

use super::required;
use crate::error::WebServerResult;
use crate::webserver_impl::WebServer;

/// GET /api/assign/admin/logs?job_id&limit
pub async fn logs<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> WebServerResult<Json<LogsResponse>> {
    let Query(query) = query?;
    let job_id = JobId::parse(&required(query.job_id, "job_id")?)?;
    let logs = server.service().job_logs(job_id, log_limit(query.limit.as_deref())).await?;
    Ok(Json(LogsResponse { ok: true, logs }))
}

/// POST /api/assign/admin/cancel
pub async fn cancel<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> WebServerResult<Json<CancelResponse>> {
    let Json(request) = body?;
    let job_id = JobId::parse(&required(request.job_id, "job_id")?)?;
    let reason = request.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let cancelled_offers = server.service().cancel_job(job_id, reason).await?;
    Ok(Json(CancelResponse {
        ok: true,
        job_id,
        cancelled_offers,
    }))
}

/// POST /api/assign/admin/sweep
pub async fn sweep<A: AssignmentService>(State(server): State<WebServer<A>>) -> WebServerResult<Json<SweepResponse>> {
    let report = server.service().expire_lapsed_offers().await?;
    server.state().record_sweep();
    Ok(Json(SweepResponse {
        ok: true,
        offers_expired: report.offers_expired,
        jobs_expired: report.jobs_expired,
    }))
}

/// GET /api/jobs/:job_id
pub async fn job<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    Path(job_id): Path<String>,
) -> WebServerResult<Json<JobSnapshot>> {
    let snapshot = server.service().job_snapshot(JobId::parse(&job_id)?).await?;
    Ok(Json(snapshot))
}

/// Unparseable limits fall back to the default; the engine clamps the rest
fn log_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .map(|value| value.floor() as i64)
}
