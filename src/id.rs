//! Strongly typed UUID identifiers.
//!
//! The nil UUID stands in for an unset identifier. It can be constructed and
//! serialized, but every service operation rejects it as malformed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generates a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            pub const fn uuid(&self) -> Uuid {
                self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| Error::invalid_argument(format!(concat!("Incorrect ", $label, " {}"), s)))
            }
        }
    };
}

uuid_id!(
    /// Identity of the tenant that owns a record.
    TenantId,
    "tenantId"
);

uuid_id!(
    /// Identity of a [`QueueStats`](crate::queue_stats::QueueStats) record.
    QueueStatsId,
    "queueStatsId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let raw = "6f1d2c3b-4a59-4e8f-9b7a-0c1d2e3f4a5b";
        let id: TenantId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!(!id.is_nil());
    }

    #[test]
    fn test_parse_malformed() {
        let err = "not-a-uuid".parse::<QueueStatsId>().unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(
            err.to_string(),
            "Invalid argument: Incorrect queueStatsId not-a-uuid"
        );
    }

    #[test]
    fn test_random_is_not_nil() {
        assert!(!QueueStatsId::random().is_nil());
        assert!(QueueStatsId::nil().is_nil());
    }

    #[test]
    fn test_serde_transparent() {
        let id = TenantId::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<TenantId>(&json).unwrap(), id);
    }
}
