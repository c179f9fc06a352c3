//! Closed status enums and their legal transitions
//!
//! Statuses are persisted as lowercase strings; every mutation goes through
//! `transition_to` so an illegal move (for example re-opening an assigned job)
//! is rejected before it reaches the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = SharedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(SharedError::InvalidStatus {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Vetting status of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Pending,
    Approved,
    Active,
}

string_enum!(ProviderStatus, "provider", {
    Pending => "pending",
    Approved => "approved",
    Active => "active",
});

impl ProviderStatus {
    /// Standing used for ordering eligible providers (higher is better)
    pub fn rank(&self) -> u8 {
        match self {
            ProviderStatus::Active => 3,
            ProviderStatus::Approved => 2,
            ProviderStatus::Pending => 1,
        }
    }

    /// Statuses considered vetted enough for the first eligibility pass
    pub fn trusted() -> &'static [ProviderStatus] {
        &[ProviderStatus::Active, ProviderStatus::Approved]
    }
}

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Offered,
    Assigned,
    Expired,
    Cancelled,
}

string_enum!(JobStatus, "job", {
    Pending => "pending",
    Offered => "offered",
    Assigned => "assigned",
    Expired => "expired",
    Cancelled => "cancelled",
});

impl JobStatus {
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Offered)
                | (Pending, Assigned)
                | (Pending, Expired)
                | (Offered, Assigned)
                | (Offered, Expired)
                | (Offered, Cancelled)
        )
    }

    pub fn transition_to(self, next: JobStatus) -> SharedResult<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SharedError::InvalidTransition {
                entity: "job",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// A resolved job never changes status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Assigned | JobStatus::Expired | JobStatus::Cancelled)
    }
}

/// Lifecycle of a single offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Offered,
    Accepted,
    Declined,
    Expired,
    Cancelled,
}

string_enum!(OfferStatus, "offer", {
    Offered => "offered",
    Accepted => "accepted",
    Declined => "declined",
    Expired => "expired",
    Cancelled => "cancelled",
});

impl OfferStatus {
    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        *self == OfferStatus::Offered && next != OfferStatus::Offered
    }

    pub fn transition_to(self, next: OfferStatus) -> SharedResult<OfferStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SharedError::InvalidTransition {
                entity: "offer",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_open(&self) -> bool {
        *self == OfferStatus::Offered
    }
}

/// Result of a decline request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclineState {
    Declined,
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_rank_order() {
        assert!(ProviderStatus::Active.rank() > ProviderStatus::Approved.rank());
        assert!(ProviderStatus::Approved.rank() > ProviderStatus::Pending.rank());
    }

    #[test]
    fn test_job_transitions_follow_state_machine() {
        assert_eq!(JobStatus::Pending.transition_to(JobStatus::Offered), Ok(JobStatus::Offered));
        assert_eq!(JobStatus::Pending.transition_to(JobStatus::Assigned), Ok(JobStatus::Assigned));
        assert_eq!(JobStatus::Offered.transition_to(JobStatus::Cancelled), Ok(JobStatus::Cancelled));

        // Nothing leaves a terminal status
        for terminal in [JobStatus::Assigned, JobStatus::Expired, JobStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for next in JobStatus::ALL {
                assert!(!terminal.can_transition_to(*next), "{terminal} -> {next} must be illegal");
            }
        }

        // A pending job cannot be cancelled, only resolved by broadcast
        assert!(JobStatus::Pending.transition_to(JobStatus::Cancelled).is_err());
    }

    #[test]
    fn test_offer_transitions_only_leave_offered() {
        for next in [OfferStatus::Accepted, OfferStatus::Declined, OfferStatus::Expired, OfferStatus::Cancelled] {
            assert!(OfferStatus::Offered.can_transition_to(next));
            assert!(!next.can_transition_to(OfferStatus::Offered));
            assert!(next.transition_to(OfferStatus::Expired).is_err());
        }
        assert!(!OfferStatus::Offered.can_transition_to(OfferStatus::Offered));
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("Active".parse::<ProviderStatus>(), Ok(ProviderStatus::Active));
        assert_eq!(" expired ".parse::<OfferStatus>(), Ok(OfferStatus::Expired));
        assert!("archived".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Offered).unwrap(), "\"offered\"");
        assert_eq!(serde_json::to_string(&DeclineState::Noop).unwrap(), "\"noop\"");
    }
}
