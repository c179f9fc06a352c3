//! Engine configuration

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{HoldMinutes, ProviderStatus, SharedError};

use crate::error::{EngineError, EngineResult};

/// Outbound collaborator calls never wait longer than this
pub const MAX_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for the admin log listing
pub const MAX_LOG_LIMIT: u32 = 200;

/// Which provider statuses an eligibility lookup considers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EligibilityPolicy {
    /// Single pass over active, approved and pending providers
    Wide,
    /// Active and approved first; pending only when that pass is empty
    PreferTrusted,
}

impl EligibilityPolicy {
    /// Status sets to query, in order; later passes run only if earlier ones are empty
    pub fn passes(&self) -> Vec<&'static [ProviderStatus]> {
        match self {
            EligibilityPolicy::Wide => vec![ProviderStatus::ALL],
            EligibilityPolicy::PreferTrusted => vec![ProviderStatus::trusted(), &[ProviderStatus::Pending]],
        }
    }
}

impl FromStr for EligibilityPolicy {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wide" => Ok(EligibilityPolicy::Wide),
            "prefer-trusted" | "prefer_trusted" | "two-pass" => Ok(EligibilityPolicy::PreferTrusted),
            other => Err(SharedError::InvalidConfig {
                field: "broadcast_policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_hold: HoldMinutes,
    pub broadcast_policy: EligibilityPolicy,
    pub max_log_limit: u32,
    pub export_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_hold: HoldMinutes::DEFAULT,
            broadcast_policy: EligibilityPolicy::Wide,
            max_log_limit: MAX_LOG_LIMIT,
            export_timeout: MAX_EXPORT_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_default_hold(mut self, minutes: u32) -> Self {
        self.default_hold = HoldMinutes::new(minutes);
        self
    }

    pub fn with_broadcast_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.broadcast_policy = policy;
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_log_limit == 0 || self.max_log_limit > MAX_LOG_LIMIT {
            return Err(EngineError::config(format!(
                "max_log_limit must be within 1..={MAX_LOG_LIMIT}, got {}",
                self.max_log_limit
            )));
        }
        if self.export_timeout.is_zero() || self.export_timeout > MAX_EXPORT_TIMEOUT {
            return Err(EngineError::config(format!(
                "export_timeout must be within (0, {}s], got {:?}",
                MAX_EXPORT_TIMEOUT.as_secs(),
                self.export_timeout
            )));
        }
        Ok(())
    }

    /// Clamp a requested page size into `1..=max_log_limit`; absent means 100
    pub fn log_limit(&self, requested: Option<i64>) -> u32 {
        let limit = requested.unwrap_or(100).clamp(1, self.max_log_limit as i64);
        limit as u32
    }
}
