//! Eligibility Resolver
//!
//! A provider is eligible when it offers the service, covers the location
//! and holds one of the statuses the policy allows. Results are ranked by
//! status then company name.

use std::sync::Arc;

use shared::EligibleProvider;

use crate::assignment::abandon;
use crate::config::EligibilityPolicy;
use crate::core::{rank_providers, require_code};
use crate::error::EngineResult;
use crate::traits::{AssignmentStore, StoreTransaction};

/// Resolve inside an open transaction so the answer cannot drift before it is used
pub async fn resolve_in<T: StoreTransaction>(
    tx: &mut T,
    service_code: &str,
    location_code: &str,
    policy: EligibilityPolicy,
) -> EngineResult<Vec<EligibleProvider>> {
    for statuses in policy.passes() {
        let found = tx.eligible_providers(service_code, location_code, statuses).await?;
        if !found.is_empty() {
            return Ok(rank_providers(found));
        }
    }
    Ok(Vec::new())
}

pub struct EligibilityResolver<S: AssignmentStore> {
    store: Arc<S>,
}

impl<S: AssignmentStore> EligibilityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read-only two-pass lookup: trusted providers first, pending only if none
    pub async fn resolve(&self, service_code: &str, location_code: &str) -> EngineResult<Vec<EligibleProvider>> {
        let service_code = require_code("service_code", Some(service_code))?;
        let location_code = require_code("location_code", Some(location_code))?;

        let mut tx = self.store.begin().await?;
        match resolve_in(&mut tx, &service_code, &location_code, EligibilityPolicy::PreferTrusted).await {
            Ok(providers) => {
                tx.rollback().await?;
                Ok(providers)
            }
            Err(e) => Err(abandon(tx, e).await),
        }
    }
}
