//! Test fixtures and data for engine tests

use chrono::{DateTime, TimeZone, Utc};
use shared::ProviderStatus;

/// Standard test data
pub struct TestFixtures;

impl TestFixtures {
    pub const SERVICE: &'static str = "EXIT_SIGN";
    pub const LOCATION: &'static str = "11223";
    pub const OTHER_LOCATION: &'static str = "90210";

    /// A fixed start instant with millisecond precision
    pub fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    /// Three providers covering the standard service and location
    pub fn three_providers() -> Vec<(&'static str, ProviderStatus)> {
        vec![
            ("Acme Fire Safety", ProviderStatus::Active),
            ("Beacon Inspections", ProviderStatus::Approved),
            ("Cobalt Compliance", ProviderStatus::Pending),
        ]
    }
}
