//! Port plumbing shared by the domain crates
//!
//! Every storage trait (`LoanPort`, `FundsLedgerPort`, `ClientPort`, ...)
//! lives next to its aggregate and returns [`PortError`]. Each trait has an
//! in-memory adapter behind the `mock` feature of its crate; the funds
//! ledger also has a PostgreSQL adapter in `infra_db`.
//!
//! ```text
//!   lending_service ──► LoanPort / FundsLedgerPort / ... ◄── Mock*, Postgres*
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a storage adapter
#[derive(Debug, Error)]
pub enum PortError {
    #[error("{entity_type} {id} does not exist")]
    NotFound { entity_type: String, id: String },

    #[error("Rejected by storage: {message}")]
    Validation { message: String },

    /// A uniqueness rule or an optimistic write check failed
    #[error("Write conflict: {message}")]
    Conflict { message: String },

    #[error("Storage unreachable: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Storage failure: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict { message: message.into() }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Connection failures may succeed when retried; nothing else will
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Bound shared by every port trait so services can hold them as
/// `Arc<dyn ...>` across tasks
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// One adapter's answer to a health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// Result for in-process adapters, which cannot be unreachable
    pub fn healthy(adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_entity() {
        let error = PortError::not_found("Loan", "LN-2025-000001");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert_eq!(error.to_string(), "Loan LN-2025-000001 does not exist");
    }

    #[test]
    fn test_only_connection_failures_are_transient() {
        assert!(PortError::connection("pool closed").is_transient());
        assert!(!PortError::validation("negative amount").is_transient());
        assert!(!PortError::internal("corrupt row").is_transient());
    }

    #[test]
    fn test_conflict_keeps_the_message() {
        let conflict = PortError::conflict("duplicate transaction id MPESA123");
        assert!(!conflict.is_transient());
        assert!(conflict.to_string().contains("MPESA123"));
    }

    #[test]
    fn test_healthy_result_has_no_message() {
        let result = HealthCheckResult::healthy("mock_loans");
        assert_eq!(result.status, AdapterHealth::Healthy);
        assert!(result.message.is_none());
    }
}
