//! Lending Domain Ports
//!
//! Repository ports for plans, items, loans and payments. The service layer
//! holds them as `Arc<dyn ...Port>` and never sees the storage behind them.
//!
//! Every port is a plain load/save boundary: validation and state changes
//! happen on the aggregates before `save_*` is called, and `save_*` is an
//! upsert keyed by the aggregate id.

use async_trait::async_trait;

use core_kernel::{
    ClientId, DomainPort, HealthCheckable, InterestPlanId, ItemId, LoanId, PaymentId, PortError,
};

use crate::item::Item;
use crate::loan::{Loan, LoanStatus};
use crate::payment::Payment;
use crate::plan::InterestPlan;

/// Filter for listing loans
#[derive(Debug, Clone, Default)]
pub struct LoanQuery {
    pub client_id: Option<ClientId>,
    pub statuses: Option<Vec<LoanStatus>>,
}

impl LoanQuery {
    pub fn for_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: impl Into<Vec<LoanStatus>>) -> Self {
        self.statuses = Some(statuses.into());
        self
    }

    pub fn matches(&self, loan: &Loan) -> bool {
        if let Some(client_id) = self.client_id {
            if loan.client_id != client_id {
                return false;
            }
        }
        if let Some(ref statuses) = self.statuses {
            if !statuses.contains(&loan.status) {
                return false;
            }
        }
        true
    }
}

/// Filter for listing payments
#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
    pub loan_id: Option<LoanId>,
    pub client_id: Option<ClientId>,
}

impl PaymentQuery {
    pub fn for_loan(loan_id: LoanId) -> Self {
        Self {
            loan_id: Some(loan_id),
            ..Default::default()
        }
    }

    pub fn for_client(client_id: ClientId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        if let Some(loan_id) = self.loan_id {
            if payment.loan_id != loan_id {
                return false;
            }
        }
        if let Some(client_id) = self.client_id {
            if payment.client_id != client_id {
                return false;
            }
        }
        true
    }
}

/// Interest plan storage
#[async_trait]
pub trait InterestPlanPort: DomainPort + HealthCheckable {
    async fn get_plan(&self, id: InterestPlanId) -> Result<InterestPlan, PortError>;

    async fn save_plan(&self, plan: &InterestPlan) -> Result<(), PortError>;
}

/// Item storage
#[async_trait]
pub trait ItemPort: DomainPort + HealthCheckable {
    async fn get_item(&self, id: ItemId) -> Result<Item, PortError>;

    async fn save_item(&self, item: &Item) -> Result<(), PortError>;
}

/// Loan storage
#[async_trait]
pub trait LoanPort: DomainPort + HealthCheckable {
    async fn get_loan(&self, id: LoanId) -> Result<Loan, PortError>;

    async fn save_loan(&self, loan: &Loan) -> Result<(), PortError>;

    /// Loans matching the query, oldest first
    async fn find_loans(&self, query: LoanQuery) -> Result<Vec<Loan>, PortError>;

    /// Next value of the per-year loan number sequence, starting at 1
    async fn next_loan_sequence(&self, year: i32) -> Result<u32, PortError>;
}

/// Payment storage
#[async_trait]
pub trait PaymentPort: DomainPort + HealthCheckable {
    async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError>;

    async fn save_payment(&self, payment: &Payment) -> Result<(), PortError>;

    /// Payments matching the query, oldest first
    async fn find_payments(&self, query: PaymentQuery) -> Result<Vec<Payment>, PortError>;

    /// True if any payment, in any status, carries this reference
    async fn transaction_id_exists(&self, transaction_id: &str) -> Result<bool, PortError>;

    /// Next value of the per-year payment number sequence, starting at 1
    async fn next_payment_sequence(&self, year: i32) -> Result<u32, PortError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory interest plans
    #[derive(Debug, Default)]
    pub struct MockInterestPlanPort {
        plans: Arc<RwLock<HashMap<InterestPlanId, InterestPlan>>>,
    }

    impl MockInterestPlanPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_plans(plans: Vec<InterestPlan>) -> Self {
            let port = Self::new();
            for plan in plans {
                port.plans.write().await.insert(plan.id, plan);
            }
            port
        }
    }

    impl DomainPort for MockInterestPlanPort {}

    #[async_trait]
    impl HealthCheckable for MockInterestPlanPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-interest-plan-port")
        }
    }

    #[async_trait]
    impl InterestPlanPort for MockInterestPlanPort {
        async fn get_plan(&self, id: InterestPlanId) -> Result<InterestPlan, PortError> {
            self.plans
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("InterestPlan", id))
        }

        async fn save_plan(&self, plan: &InterestPlan) -> Result<(), PortError> {
            self.plans.write().await.insert(plan.id, plan.clone());
            Ok(())
        }
    }

    /// In-memory items
    #[derive(Debug, Default)]
    pub struct MockItemPort {
        items: Arc<RwLock<HashMap<ItemId, Item>>>,
    }

    impl MockItemPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_items(items: Vec<Item>) -> Self {
            let port = Self::new();
            for item in items {
                port.items.write().await.insert(item.id, item);
            }
            port
        }
    }

    impl DomainPort for MockItemPort {}

    #[async_trait]
    impl HealthCheckable for MockItemPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-item-port")
        }
    }

    #[async_trait]
    impl ItemPort for MockItemPort {
        async fn get_item(&self, id: ItemId) -> Result<Item, PortError> {
            self.items
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Item", id))
        }

        async fn save_item(&self, item: &Item) -> Result<(), PortError> {
            self.items.write().await.insert(item.id, item.clone());
            Ok(())
        }
    }

    /// In-memory loans with a per-year number sequence
    #[derive(Debug, Default)]
    pub struct MockLoanPort {
        loans: Arc<RwLock<HashMap<LoanId, Loan>>>,
        sequences: Arc<RwLock<HashMap<i32, u32>>>,
    }

    impl MockLoanPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_loans(loans: Vec<Loan>) -> Self {
            let port = Self::new();
            for loan in loans {
                port.loans.write().await.insert(loan.id, loan);
            }
            port
        }
    }

    impl DomainPort for MockLoanPort {}

    #[async_trait]
    impl HealthCheckable for MockLoanPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-loan-port")
        }
    }

    #[async_trait]
    impl LoanPort for MockLoanPort {
        async fn get_loan(&self, id: LoanId) -> Result<Loan, PortError> {
            self.loans
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Loan", id))
        }

        async fn save_loan(&self, loan: &Loan) -> Result<(), PortError> {
            self.loans.write().await.insert(loan.id, loan.clone());
            Ok(())
        }

        async fn find_loans(&self, query: LoanQuery) -> Result<Vec<Loan>, PortError> {
            let loans = self.loans.read().await;
            let mut results: Vec<Loan> = loans
                .values()
                .filter(|loan| query.matches(loan))
                .cloned()
                .collect();
            results.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(results)
        }

        async fn next_loan_sequence(&self, year: i32) -> Result<u32, PortError> {
            let mut sequences = self.sequences.write().await;
            let next = sequences.entry(year).or_insert(0);
            *next += 1;
            Ok(*next)
        }
    }

    /// In-memory payments with a per-year number sequence
    #[derive(Debug, Default)]
    pub struct MockPaymentPort {
        payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
        sequences: Arc<RwLock<HashMap<i32, u32>>>,
    }

    impl MockPaymentPort {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockPaymentPort {}

    #[async_trait]
    impl HealthCheckable for MockPaymentPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("mock-payment-port")
        }
    }

    #[async_trait]
    impl PaymentPort for MockPaymentPort {
        async fn get_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
            self.payments
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payment", id))
        }

        async fn save_payment(&self, payment: &Payment) -> Result<(), PortError> {
            let mut payments = self.payments.write().await;
            if let Some(ref reference) = payment.transaction_id {
                let taken = payments.values().any(|p| {
                    p.id != payment.id && p.transaction_id.as_deref() == Some(reference.as_str())
                });
                if taken {
                    return Err(PortError::conflict(format!(
                        "Transaction ID {} already recorded",
                        reference
                    )));
                }
            }
            payments.insert(payment.id, payment.clone());
            Ok(())
        }

        async fn find_payments(&self, query: PaymentQuery) -> Result<Vec<Payment>, PortError> {
            let payments = self.payments.read().await;
            let mut results: Vec<Payment> = payments
                .values()
                .filter(|payment| query.matches(payment))
                .cloned()
                .collect();
            results.sort_by(|a, b| a.payment_date.cmp(&b.payment_date).then(a.id.cmp(&b.id)));
            Ok(results)
        }

        async fn transaction_id_exists(&self, transaction_id: &str) -> Result<bool, PortError> {
            Ok(self
                .payments
                .read()
                .await
                .values()
                .any(|p| p.transaction_id.as_deref() == Some(transaction_id)))
        }

        async fn next_payment_sequence(&self, year: i32) -> Result<u32, PortError> {
            let mut sequences = self.sequences.write().await;
            let next = sequences.entry(year).or_insert(0);
            *next += 1;
            Ok(*next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use chrono::Utc;
    use core_kernel::{Currency, Money, UserId};
    use crate::payment::{document_number, Lateness, PaymentMethod};

    fn mpesa_payment(reference: &str) -> Payment {
        let now = Utc::now();
        Payment::completed(
            document_number("PMT", 2024, 1),
            LoanId::new(),
            ClientId::new(),
            Money::from_major(100, Currency::KES),
            PaymentMethod::Mpesa,
            Some(reference.to_string()),
            now,
            now,
            Lateness::on_time(&Money::from_major(100, Currency::KES)),
            UserId::new(),
        )
    }

    #[tokio::test]
    async fn test_sequences_are_per_year() {
        let port = MockLoanPort::new();
        assert_eq!(port.next_loan_sequence(2024).await.unwrap(), 1);
        assert_eq!(port.next_loan_sequence(2024).await.unwrap(), 2);
        assert_eq!(port.next_loan_sequence(2025).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_id_conflicts() {
        let port = MockPaymentPort::new();
        port.save_payment(&mpesa_payment("QAB12")).await.unwrap();

        assert!(port.transaction_id_exists("QAB12").await.unwrap());
        assert!(!port.transaction_id_exists("ZZZ").await.unwrap());

        let result = port.save_payment(&mpesa_payment("QAB12")).await;
        assert!(matches!(result, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_missing_loan_is_not_found() {
        let port = MockLoanPort::new();
        let result = port.get_loan(LoanId::new()).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
