//! Provider onboarding and status changes

use std::sync::Arc;

use serde_json::json;
use shared::{LogEvent, NewLogEntry, Provider, ProviderId, ProviderStatus};
use tracing::instrument;

use crate::assignment::{abandon, audit};
use crate::core::{normalize_codes, require_code};
use crate::error::{EngineError, EngineResult};
use crate::traits::{AssignmentStore, Clock, NewProvider, StoreTransaction};

pub struct ProviderRegistry<S: AssignmentStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: AssignmentStore, C: Clock> ProviderRegistry<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    #[instrument(skip(self, request), fields(company_name = %request.company_name))]
    pub async fn register(&self, request: NewProvider) -> EngineResult<Provider> {
        let now = self.clock.now();
        let provider = Provider {
            id: ProviderId::new(),
            company_name: require_code("company_name", Some(&request.company_name))?,
            contact_email: non_blank(request.contact_email),
            contact_phone: non_blank(request.contact_phone),
            status: request.status,
            services: normalize_codes("services", &request.services)?,
            locations: normalize_codes("locations", &request.locations)?,
            created_at: now,
        };

        let mut tx = self.store.begin().await?;
        let result = async {
            tx.insert_provider(&provider).await?;
            let entry = NewLogEntry {
                job_id: None,
                provider_id: Some(provider.id),
                event: LogEvent::ProviderRegistered,
                meta: json!({
                    "status": provider.status,
                    "services": provider.services,
                    "locations": provider.locations,
                }),
                created_at: now,
            };
            audit::record(&mut tx, entry).await
        }
        .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(provider)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, provider_id: ProviderId, status: ProviderStatus) -> EngineResult<Provider> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let result = async {
            let mut provider = tx
                .find_provider(provider_id)
                .await?
                .ok_or_else(|| EngineError::not_found("provider", provider_id))?;
            let previous = provider.status;
            if previous != status {
                tx.update_provider_status(provider_id, status).await?;
                let entry = NewLogEntry {
                    job_id: None,
                    provider_id: Some(provider_id),
                    event: LogEvent::ProviderStatusChanged,
                    meta: json!({ "from": previous, "to": status }),
                    created_at: now,
                };
                audit::record(&mut tx, entry).await?;
                provider.status = status;
            }
            Ok::<Provider, EngineError>(provider)
        }
        .await;

        match result {
            Ok(provider) => {
                tx.commit().await?;
                Ok(provider)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
