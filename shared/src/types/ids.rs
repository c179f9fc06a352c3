//! Strongly typed identifiers for jobs, offers and providers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{SharedError, SharedResult};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from user input, tolerating surrounding whitespace
            pub fn parse(input: &str) -> SharedResult<Self> {
                Uuid::parse_str(input.trim())
                    .map(Self)
                    .map_err(|_| SharedError::InvalidUuid { input: input.to_string() })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SharedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a job awaiting (or holding) a provider
    JobId
);

uuid_id!(
    /// Identifier of a service provider
    ProviderId
);

uuid_id!(
    /// Identifier of a single offer row
    OfferId
);
