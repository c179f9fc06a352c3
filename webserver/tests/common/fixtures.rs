//! Test fixtures for webserver tests

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::{TimeZone, Utc};
use shared::{Assignment, JobId, ProviderId};

pub struct TestFixtures;

impl TestFixtures {
    pub const SERVICE: &'static str = "EXIT_SIGN";
    pub const LOCATION: &'static str = "11223";

    pub fn bind_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    pub fn assignment(job_id: JobId, provider_id: ProviderId) -> Assignment {
        Assignment {
            job_id,
            provider_id,
            assigned_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 5, 0).unwrap(),
        }
    }
}
