//! Service-specific tests
//!
//! Each service has its own test file; shared helpers live in `common`.

#[cfg(test)]
mod directory_export;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use chrono::{DateTime, TimeZone, Utc};
    use shared::{Provider, ProviderId, ProviderStatus};

    use crate::services::SqliteStore;
    use crate::traits::{AssignmentStore, StoreTransaction};

    /// Fixed instant with millisecond precision
    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    pub async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.expect("in-memory store")
    }

    pub fn provider(name: &str, status: ProviderStatus, services: &[&str], locations: &[&str]) -> Provider {
        Provider {
            id: ProviderId::new(),
            company_name: name.to_string(),
            contact_email: None,
            contact_phone: None,
            status,
            services: services.iter().map(|s| s.to_string()).collect(),
            locations: locations.iter().map(|l| l.to_string()).collect(),
            created_at: t0(),
        }
    }

    pub async fn seed(store: &SqliteStore, providers: &[Provider]) {
        let mut tx = store.begin().await.unwrap();
        for p in providers {
            tx.insert_provider(p).await.unwrap();
        }
        tx.commit().await.unwrap();
    }
}
