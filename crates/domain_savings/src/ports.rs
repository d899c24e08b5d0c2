//! Savings Domain Ports

use async_trait::async_trait;

use core_kernel::{ClientId, DomainPort, HealthCheckable, PortError, SavingsAccountId};

use crate::account::SavingsAccount;

/// Savings account storage
///
/// A client holds at most one active account and savings numbers are unique:
/// `save_account` returns `PortError::Conflict` when either would break.
#[async_trait]
pub trait SavingsPort: DomainPort + HealthCheckable {
    async fn get_account(&self, id: SavingsAccountId) -> Result<SavingsAccount, PortError>;

    async fn save_account(&self, account: &SavingsAccount) -> Result<(), PortError>;

    async fn find_active_for_client(&self, client_id: ClientId) -> Result<Option<SavingsAccount>, PortError>;

    async fn savings_number_exists(&self, savings_number: &str) -> Result<bool, PortError>;

    /// Every account, active or not
    async fn list_accounts(&self) -> Result<Vec<SavingsAccount>, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory savings accounts
    #[derive(Debug, Default)]
    pub struct MockSavingsPort {
        accounts: Arc<RwLock<HashMap<SavingsAccountId, SavingsAccount>>>,
    }

    impl MockSavingsPort {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockSavingsPort {}

    #[async_trait]
    impl HealthCheckable for MockSavingsPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-savings-port")
        }
    }

    #[async_trait]
    impl SavingsPort for MockSavingsPort {
        async fn get_account(&self, id: SavingsAccountId) -> Result<SavingsAccount, PortError> {
            self.accounts
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("SavingsAccount", id))
        }

        async fn save_account(&self, account: &SavingsAccount) -> Result<(), PortError> {
            let mut accounts = self.accounts.write().await;
            for other in accounts.values().filter(|a| a.id != account.id) {
                if other.savings_number == account.savings_number {
                    return Err(PortError::conflict(format!(
                        "Savings number {} is already in use",
                        account.savings_number
                    )));
                }
                if account.is_active && other.is_active && other.client_id == account.client_id {
                    return Err(PortError::conflict("Client already has an active savings account"));
                }
            }
            accounts.insert(account.id, account.clone());
            Ok(())
        }

        async fn find_active_for_client(&self, client_id: ClientId) -> Result<Option<SavingsAccount>, PortError> {
            Ok(self
                .accounts
                .read()
                .await
                .values()
                .find(|a| a.client_id == client_id && a.is_active)
                .cloned())
        }

        async fn savings_number_exists(&self, savings_number: &str) -> Result<bool, PortError> {
            Ok(self
                .accounts
                .read()
                .await
                .values()
                .any(|a| a.savings_number == savings_number))
        }

        async fn list_accounts(&self) -> Result<Vec<SavingsAccount>, PortError> {
            let mut accounts: Vec<SavingsAccount> = self.accounts.read().await.values().cloned().collect();
            accounts.sort_by_key(|a| a.created_at);
            Ok(accounts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockSavingsPort;
    use super::*;
    use chrono::Utc;
    use core_kernel::{Currency, UserId};
    use crate::account::generate_savings_number;

    fn account(client_id: ClientId) -> SavingsAccount {
        SavingsAccount::open(client_id, generate_savings_number(), None, Currency::KES, UserId::new(), Utc::now())
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_active_account_per_client() {
        let port = MockSavingsPort::new();
        let client = ClientId::new();
        let mut first = account(client);
        port.save_account(&first).await.unwrap();

        let second = account(client);
        assert!(matches!(port.save_account(&second).await, Err(PortError::Conflict { .. })));

        first.update(None, Some(false), Utc::now()).unwrap();
        port.save_account(&first).await.unwrap();
        port.save_account(&second).await.unwrap();

        let active = port.find_active_for_client(client).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
    }

    #[tokio::test]
    async fn test_number_lookup() {
        let port = MockSavingsPort::new();
        let stored = account(ClientId::new());
        port.save_account(&stored).await.unwrap();

        assert!(port.savings_number_exists(&stored.savings_number).await.unwrap());
        assert!(!port.savings_number_exists("0000000000").await.unwrap());
        assert!(port.get_account(core_kernel::SavingsAccountId::new()).await.unwrap_err().is_not_found());
    }
}
