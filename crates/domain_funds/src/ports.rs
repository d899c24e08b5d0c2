//! Funds ledger port

use async_trait::async_trait;

use core_kernel::{Currency, DomainPort, HealthCheckable, PortError};

use crate::entry::LedgerEntry;
use crate::funds::CompanyFunds;

/// Storage for the company funds ledger
///
/// `append_entry` is atomic: the entry is stored and the running totals move
/// together, or neither happens. An entry whose `previous_balance` no longer
/// matches the stored balance is refused with `PortError::Conflict`.
#[async_trait]
pub trait FundsLedgerPort: DomainPort + HealthCheckable {
    /// Loads the aggregate with its full history
    async fn load_funds(&self, currency: Currency) -> Result<CompanyFunds, PortError>;

    async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory ledger
    #[derive(Debug, Default)]
    pub struct MockFundsLedgerPort {
        entries: Arc<RwLock<Vec<LedgerEntry>>>,
    }

    impl MockFundsLedgerPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn entry_count(&self) -> usize {
            self.entries.read().await.len()
        }
    }

    impl DomainPort for MockFundsLedgerPort {}

    #[async_trait]
    impl HealthCheckable for MockFundsLedgerPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-funds-ledger-port")
        }
    }

    #[async_trait]
    impl FundsLedgerPort for MockFundsLedgerPort {
        async fn load_funds(&self, currency: Currency) -> Result<CompanyFunds, PortError> {
            let entries = self.entries.read().await.clone();
            CompanyFunds::replay(currency, entries).map_err(|e| PortError::internal(e.to_string()))
        }

        async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), PortError> {
            let mut entries = self.entries.write().await;
            let balance = entries.last().map(|e| e.new_balance);
            let fits = match balance {
                Some(balance) => balance == entry.previous_balance,
                None => entry.previous_balance.is_zero(),
            };
            if !fits {
                return Err(PortError::conflict(format!(
                    "Ledger moved since entry {} was prepared",
                    entry.id
                )));
            }
            entries.push(entry.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFundsLedgerPort;
    use super::*;
    use chrono::Utc;
    use core_kernel::{Money, UserId};
    use crate::entry::{FundsEntryType, PostingRequest};

    fn kes(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    #[tokio::test]
    async fn test_append_then_load() {
        let port = MockFundsLedgerPort::new();
        let funds = port.load_funds(Currency::KES).await.unwrap();
        assert!(!funds.is_initialized());

        let entry = funds
            .prepare(PostingRequest::new(FundsEntryType::Initial, kes(5000), UserId::new(), Utc::now()))
            .unwrap();
        port.append_entry(&entry).await.unwrap();

        let reloaded = port.load_funds(Currency::KES).await.unwrap();
        assert_eq!(reloaded.current_balance, kes(5000));
        assert_eq!(port.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_append_conflicts() {
        let port = MockFundsLedgerPort::new();
        let funds = port.load_funds(Currency::KES).await.unwrap();
        let first = funds
            .prepare(PostingRequest::new(FundsEntryType::Initial, kes(5000), UserId::new(), Utc::now()))
            .unwrap();
        let racing = funds
            .prepare(PostingRequest::new(FundsEntryType::Replenishment, kes(100), UserId::new(), Utc::now()))
            .unwrap();

        port.append_entry(&first).await.unwrap();
        let result = port.append_entry(&racing).await;
        assert!(matches!(result, Err(PortError::Conflict { .. })));
        assert_eq!(port.entry_count().await, 1);
    }
}
