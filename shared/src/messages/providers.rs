//! Client ↔ WebServer messages for provider administration

use serde::{Deserialize, Serialize};

use crate::types::{EligibleProvider, Provider};

/// POST /api/providers
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RegisterProviderRequest {
    #[serde(alias = "companyName")]
    pub company_name: Option<String>,
    #[serde(alias = "contactEmail")]
    pub contact_email: Option<String>,
    #[serde(alias = "contactPhone")]
    pub contact_phone: Option<String>,
    pub status: Option<String>,
    pub services: Option<Vec<String>>,
    #[serde(alias = "zips")]
    pub locations: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProviderResponse {
    pub ok: bool,
    pub provider: Provider,
}

/// POST /api/providers/:provider_id/status
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProviderStatusRequest {
    pub status: Option<String>,
}

/// GET /api/providers/eligible
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EligibleQuery {
    pub service_code: Option<String>,
    #[serde(alias = "zip")]
    pub location_code: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EligibleResponse {
    pub ok: bool,
    pub providers: Vec<EligibleProvider>,
}
