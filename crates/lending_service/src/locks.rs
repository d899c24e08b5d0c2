//! Per-aggregate serialization
//!
//! Every read-modify-write of a loan, savings account, client or the funds
//! ledger runs while holding that aggregate's mutex. Compound operations take
//! their locks in [`AggregateKey`] order: savings, loan, client, funds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use core_kernel::{ClientId, LoanId, SavingsAccountId};

/// Identifies a lockable aggregate
///
/// The derived ordering is the lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregateKey {
    Savings(SavingsAccountId),
    Loan(LoanId),
    Client(ClientId),
    /// The company funds ledger is a singleton
    Funds,
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKey::Savings(id) => write!(f, "{}", id),
            AggregateKey::Loan(id) => write!(f, "{}", id),
            AggregateKey::Client(id) => write!(f, "{}", id),
            AggregateKey::Funds => f.write_str("company-funds"),
        }
    }
}

/// Held lock on one aggregate; released on drop
#[derive(Debug)]
pub struct AggregateGuard {
    key: AggregateKey,
    _guard: OwnedMutexGuard<()>,
}

impl AggregateGuard {
    pub fn key(&self) -> AggregateKey {
        self.key
    }
}

/// Registry of aggregate mutexes
#[derive(Debug, Clone, Default)]
pub struct AggregateLocks {
    registry: Arc<Mutex<HashMap<AggregateKey, Arc<Mutex<()>>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn handle(&self, key: AggregateKey) -> Arc<Mutex<()>> {
        let mut registry = self.registry.lock().await;
        // Drop handles nobody else holds so the map tracks live aggregates only
        registry.retain(|k, handle| *k == key || Arc::strong_count(handle) > 1);
        registry.entry(key).or_default().clone()
    }

    /// Waits for exclusive access to one aggregate
    pub async fn lock(&self, key: AggregateKey) -> AggregateGuard {
        let handle = self.handle(key).await;
        let guard = handle.lock_owned().await;
        trace!(aggregate = %key, "aggregate locked");
        AggregateGuard { key, _guard: guard }
    }

    /// Locks several aggregates in lock order, skipping duplicates
    pub async fn lock_all(&self, keys: &[AggregateKey]) -> Vec<AggregateGuard> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in ordered {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// True while some task holds `key`
    pub async fn is_locked(&self, key: AggregateKey) -> bool {
        let registry = self.registry.lock().await;
        registry
            .get(&key)
            .map(|handle| handle.try_lock().is_err())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lock_order() {
        let mut keys = vec![
            AggregateKey::Funds,
            AggregateKey::Client(ClientId::new()),
            AggregateKey::Loan(LoanId::new()),
            AggregateKey::Savings(SavingsAccountId::new()),
        ];
        keys.sort();
        assert!(matches!(keys[0], AggregateKey::Savings(_)));
        assert!(matches!(keys[1], AggregateKey::Loan(_)));
        assert!(matches!(keys[2], AggregateKey::Client(_)));
        assert_eq!(keys[3], AggregateKey::Funds);
    }

    #[tokio::test]
    async fn test_guard_excludes_second_locker() {
        let locks = AggregateLocks::new();
        let key = AggregateKey::Loan(LoanId::new());

        let guard = locks.lock(key).await;
        assert!(locks.is_locked(key).await);

        let contender = locks.clone();
        let waiting = tokio::spawn(async move { contender.lock(key).await.key() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        assert_eq!(waiting.await.unwrap(), key);
        assert!(!locks.is_locked(key).await);
    }

    #[tokio::test]
    async fn test_other_aggregates_are_independent() {
        let locks = AggregateLocks::new();
        let _loan = locks.lock(AggregateKey::Loan(LoanId::new())).await;
        let funds = tokio::time::timeout(Duration::from_millis(100), locks.lock(AggregateKey::Funds)).await;
        assert!(funds.is_ok());
    }

    #[tokio::test]
    async fn test_lock_all_dedups() {
        let locks = AggregateLocks::new();
        let loan = AggregateKey::Loan(LoanId::new());
        let guards = locks.lock_all(&[AggregateKey::Funds, loan, loan]).await;
        assert_eq!(guards.len(), 2);
        assert_eq!(guards[0].key(), loan);
    }
}
