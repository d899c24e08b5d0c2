//! Strongly-typed identifiers for domain entities
//!
//! Every aggregate is referenced by a newtype around a UUID, so a loan id can
//! never be passed where a client id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Client domain identifiers
define_id!(ClientId, "CLT");
define_id!(UserId, "USR");

// Lending domain identifiers
define_id!(LoanId, "LOAN");
define_id!(PaymentId, "PAY");
define_id!(InterestPlanId, "IPL");
define_id!(ItemId, "ITM");

// Ledger identifiers
define_id!(LedgerEntryId, "FLE");
define_id!(SavingsAccountId, "SAV");
define_id!(SavingsTransactionId, "STX");
define_id!(ReconciliationId, "REC");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_id_display() {
        let id = LoanId::new();
        assert!(id.to_string().starts_with("LOAN-"));
        assert_eq!(LoanId::prefix(), "LOAN");
    }

    #[test]
    fn test_id_parsing_with_and_without_prefix() {
        let original = ClientId::new_v7();
        let parsed: ClientId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: ClientId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let id = LedgerEntryId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
