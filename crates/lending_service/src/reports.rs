//! Portfolio statistics, reconciliation follow-up and adapter health

use tracing::{info, instrument};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, ReconciliationId, UserId};
use domain_lending::{LoanQuery, LoanStats, PaymentQuery, PaymentStats};
use domain_savings::SavingsStats;

use crate::error::ServiceError;
use crate::reconciliation::ReconciliationRecord;
use crate::service::LendingCore;

impl LendingCore {
    pub async fn loan_stats(&self) -> Result<LoanStats, ServiceError> {
        let loans = self.repos.loans.find_loans(LoanQuery::default()).await?;
        Ok(LoanStats::from_loans(self.currency, &loans)?)
    }

    pub async fn payment_stats(&self) -> Result<PaymentStats, ServiceError> {
        let payments = self.repos.payments.find_payments(PaymentQuery::default()).await?;
        Ok(PaymentStats::from_payments(self.currency, &payments)?)
    }

    /// Savings totals, this year's deposits by month and the largest active balances
    pub async fn savings_stats(&self) -> Result<SavingsStats, ServiceError> {
        let accounts = self.repos.savings.list_accounts().await?;
        Ok(SavingsStats::from_accounts(self.currency, &accounts, &self.timezone, self.now())?)
    }

    /// Side effects still waiting for manual follow-up, oldest first
    pub async fn pending_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, ServiceError> {
        Ok(self.repos.reconciliation.pending().await?)
    }

    #[instrument(skip(self), fields(record_id = %id))]
    pub async fn resolve_reconciliation(
        &self,
        id: ReconciliationId,
        resolved_by: UserId,
    ) -> Result<ReconciliationRecord, ServiceError> {
        let record = self.repos.reconciliation.resolve(id, resolved_by, self.now()).await?;
        info!(operation = %record.operation, "reconciliation resolved");
        Ok(record)
    }

    /// Health of every adapter
    pub async fn health(&self) -> Vec<HealthCheckResult> {
        vec![
            self.repos.clients.health_check().await,
            self.repos.plans.health_check().await,
            self.repos.items.health_check().await,
            self.repos.loans.health_check().await,
            self.repos.payments.health_check().await,
            self.repos.funds.health_check().await,
            self.repos.savings.health_check().await,
            self.repos.reconciliation.health_check().await,
        ]
    }

    pub async fn is_healthy(&self) -> bool {
        self.health()
            .await
            .iter()
            .all(|result| result.status == AdapterHealth::Healthy)
    }
}
