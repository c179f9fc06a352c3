//! Provider administration endpoints

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use engine::{AssignmentService, NewProvider};
use shared::{
    EligibleQuery, EligibleResponse, ProviderId, ProviderResponse, ProviderStatus, ProviderStatusRequest,
    RegisterProviderRequest,
};

use super::required;
use crate::error::WebServerResult;
use crate::webserver_impl::WebServer;

/// POST /api/providers
pub async fn register<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    body: Result<Json<RegisterProviderRequest>, JsonRejection>,
) -> WebServerResult<Json<ProviderResponse>> {
    let Json(request) = body?;
    let status = match request.status {
        Some(status) => status.trim().parse::<ProviderStatus>()?,
        None => ProviderStatus::Pending,
    };
    let provider = NewProvider {
        company_name: required(request.company_name, "company_name")?,
        contact_email: request.contact_email,
        contact_phone: request.contact_phone,
        status,
        services: request.services.unwrap_or_default(),
        locations: request.locations.unwrap_or_default(),
    };

    let provider = server.service().register_provider(provider).await?;
    Ok(Json(ProviderResponse { ok: true, provider }))
}

/// POST /api/providers/:provider_id/status
pub async fn set_status<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    Path(provider_id): Path<String>,
    body: Result<Json<ProviderStatusRequest>, JsonRejection>,
) -> WebServerResult<Json<ProviderResponse>> {
    let provider_id = ProviderId::parse(&provider_id)?;
    let status: ProviderStatus = required(body?.0.status, "status")?.parse()?;

    let provider = server.service().set_provider_status(provider_id, status).await?;
    Ok(Json(ProviderResponse { ok: true, provider }))
}

/// GET /api/providers/eligible?service_code&location_code
pub async fn eligible<A: AssignmentService>(
    State(server): State<WebServer<A>>,
    query: Result<Query<EligibleQuery>, QueryRejection>,
) -> WebServerResult<Json<EligibleResponse>> {
    let Query(query) = query?;
    let service_code = required(query.service_code, "service_code")?;
    let location_code = required(query.location_code, "location_code")?;

    let providers = server.service().eligible_providers(service_code, location_code).await?;
    Ok(Json(EligibleResponse { ok: true, providers }))
}
