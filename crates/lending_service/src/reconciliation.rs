//! Reconciliation records
//!
//! Once a loan update has committed it is never rolled back. If a follow-up
//! side effect fails (ledger post, client counters, item stock, savings
//! compensation), the failure is written down here for manual follow-up.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use core_kernel::{
    ClientId, DomainPort, HealthCheckResult, HealthCheckable, ItemId, LoanId, Money, PaymentId, PortError,
    ReconciliationId, SavingsAccountId, UserId,
};

/// Side effect that did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconciliationOperation {
    /// Repayment or deposit not posted to the funds ledger
    RepaymentPosting,
    /// Reversal expense not posted to the funds ledger
    ReversalPosting,
    /// A disbursement whose loan was not saved could not be paid back
    DisbursementRollback,
    /// A reversed payment could not be restored after its loan was not saved
    ReversalRollback,
    /// Client counters not moved after a disbursement
    DisbursementCounters,
    /// Item stock not decremented after a disbursement
    ItemStock,
    /// Client counters or score not moved after a completion
    CompletionCounters,
    /// Client counters not restored after a reversal reopened a loan
    ReopenCounters,
    /// Client counters not moved after a default
    DefaultCounters,
    /// A savings debit could not be put back after its payment failed
    SavingsCompensation,
}

impl fmt::Display for ReconciliationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconciliationOperation::RepaymentPosting => "repayment-posting",
            ReconciliationOperation::ReversalPosting => "reversal-posting",
            ReconciliationOperation::DisbursementRollback => "disbursement-rollback",
            ReconciliationOperation::ReversalRollback => "reversal-rollback",
            ReconciliationOperation::DisbursementCounters => "disbursement-counters",
            ReconciliationOperation::ItemStock => "item-stock",
            ReconciliationOperation::CompletionCounters => "completion-counters",
            ReconciliationOperation::ReopenCounters => "reopen-counters",
            ReconciliationOperation::DefaultCounters => "default-counters",
            ReconciliationOperation::SavingsCompensation => "savings-compensation",
        };
        f.write_str(name)
    }
}

/// A failed secondary side effect awaiting manual follow-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub id: ReconciliationId,
    pub operation: ReconciliationOperation,
    pub loan_id: Option<LoanId>,
    pub payment_id: Option<PaymentId>,
    pub client_id: Option<ClientId>,
    pub item_id: Option<ItemId>,
    pub savings_account_id: Option<SavingsAccountId>,
    /// Amount the missing movement should have carried
    pub amount: Option<Money>,
    pub error: String,
    pub recorded_at: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ReconciliationRecord {
    /// An unresolved record; the error is filled in when it is stored
    pub fn new(operation: ReconciliationOperation, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: ReconciliationId::new_v7(),
            operation,
            loan_id: None,
            payment_id: None,
            client_id: None,
            item_id: None,
            savings_account_id: None,
            amount: None,
            error: String::new(),
            recorded_at,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        }
    }

    pub fn for_loan(mut self, loan_id: LoanId) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn for_payment(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn for_item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    pub fn for_savings(mut self, account_id: SavingsAccountId) -> Self {
        self.savings_account_id = Some(account_id);
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Port for reconciliation records
#[async_trait]
pub trait ReconciliationPort: DomainPort + HealthCheckable {
    async fn record(&self, record: &ReconciliationRecord) -> Result<(), PortError>;

    /// Unresolved records, oldest first
    async fn pending(&self) -> Result<Vec<ReconciliationRecord>, PortError>;

    async fn resolve(
        &self,
        id: ReconciliationId,
        resolved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<ReconciliationRecord, PortError>;
}

/// Process-local reconciliation log
#[derive(Debug, Clone, Default)]
pub struct InMemoryReconciliationLog {
    records: Arc<RwLock<Vec<ReconciliationRecord>>>,
}

impl InMemoryReconciliationLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for InMemoryReconciliationLog {}

#[async_trait]
impl HealthCheckable for InMemoryReconciliationLog {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("in-memory-reconciliation")
    }
}

#[async_trait]
impl ReconciliationPort for InMemoryReconciliationLog {
    async fn record(&self, record: &ReconciliationRecord) -> Result<(), PortError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(PortError::conflict(format!("Reconciliation {} already recorded", record.id)));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<ReconciliationRecord>, PortError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| !r.resolved).cloned().collect())
    }

    async fn resolve(
        &self,
        id: ReconciliationId,
        resolved_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<ReconciliationRecord, PortError> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortError::not_found("ReconciliationRecord", id))?;
        if record.resolved {
            return Err(PortError::conflict(format!("Reconciliation {} is already resolved", id)));
        }
        record.resolved = true;
        record.resolved_by = Some(resolved_by);
        record.resolved_at = Some(at);
        Ok(record.clone())
    }
}
