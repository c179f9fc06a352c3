//! Broadcast, accept and decline endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use engine::{AssignmentService, BroadcastCommand};
use serde_json::{json, Value};
use shared::{
    AcceptResponse, BroadcastRequest, BroadcastResponse, DeclineResponse, HoldMinutes, JobId, OfferReplyRequest,
    ProviderId,
};

use super::required;
use crate::error::WebServerResult;
use crate::webserver_impl::WebServer;

/// POST /api/assign/broadcast
pub async fn broadcast<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    body: Result<Json<BroadcastRequest>, JsonRejection>,
) -> WebServerResult<Json<BroadcastResponse>> {
    let Json(request) = body?;
    let command = BroadcastCommand {
        service_code: required(request.service_code, "service_code")?,
        location_code: required(request.location_code, "location_code")?,
        hold_minutes: hold_minutes(request.hold_minutes.as_ref()),
        metadata: request.metadata.unwrap_or(Value::Null),
    };

    let outcome = server.service().broadcast(command).await?;
    Ok(Json(BroadcastResponse {
        job_id: outcome.job_id,
        eligible_count: outcome.eligible_count,
        assigned: outcome.assigned_provider().map(Into::into),
    }))
}

/// POST /api/assign/accept
pub async fn accept<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    body: Result<Json<OfferReplyRequest>, JsonRejection>,
) -> WebServerResult<Json<AcceptResponse>> {
    let (job_id, provider_id) = reply_ids(body?.0)?;
    let assignment = server.service().accept(job_id, provider_id).await?;
    Ok(Json(AcceptResponse {
        job_id: assignment.job_id,
        assigned: assignment.provider_id.into(),
    }))
}

/// POST /api/assign/decline
pub async fn decline<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    body: Result<Json<OfferReplyRequest>, JsonRejection>,
) -> WebServerResult<Json<DeclineResponse>> {
    let (job_id, provider_id) = reply_ids(body?.0)?;
    let state = server.service().decline(job_id, provider_id).await?;
    Ok(Json(DeclineResponse { ok: true, state }))
}

/// GET on the mutating routes, for route probes
pub async fn methods() -> Json<Value> {
    Json(json!({ "ok": true, "methods": ["POST"] }))
}

fn reply_ids(request: OfferReplyRequest) -> WebServerResult<(JobId, ProviderId)> {
    let job_id = required(request.job_id, "job_id")?;
    let provider_id = required(request.provider_id, "provider_id")?;
    Ok((JobId::parse(&job_id)?, ProviderId::parse(&provider_id)?))
}

/// Non-numeric values fall back to the engine default; numbers floor to whole minutes
fn hold_minutes(requested: Option<&Value>) -> Option<HoldMinutes> {
    requested
        .and_then(Value::as_f64)
        .filter(|minutes| minutes.is_finite())
        .map(|minutes| HoldMinutes::clamp(Some(minutes.floor() as i64), HoldMinutes::DEFAULT))
}
