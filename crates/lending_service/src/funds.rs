//! Company funds operations and reports

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use core_kernel::{Currency, Money, UserId};
use domain_funds::{
    CompanyFunds, FundsEntryType, FundsSummary, LedgerEntry, MonthlyTotals, PostingRequest, TransactionFilter,
    TypeTotal,
};

use crate::error::ServiceError;
use crate::service::LendingCore;

/// Result of re-walking the funds ledger
#[derive(Debug, Clone, Serialize)]
pub struct FundsAudit {
    pub currency: Currency,
    pub entry_count: usize,
    pub current_balance: Money,
    pub summary: FundsSummary,
    /// First broken invariant, if any
    pub problem: Option<String>,
}

impl FundsAudit {
    pub fn is_clean(&self) -> bool {
        self.problem.is_none()
    }
}

impl LendingCore {
    /// Posts one entry of any type
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds` if a decrease would take the balance below zero
    /// - `Validation` for a non-positive amount, a missing expense
    ///   description, or a second `initial` entry
    #[instrument(skip(self, request), fields(entry_type = %request.entry_type, amount = %request.amount))]
    pub async fn post_ledger_entry(&self, request: PostingRequest) -> Result<CompanyFunds, ServiceError> {
        self.post_funds(request).await
    }

    pub async fn initialize_funds(&self, amount: Money, processed_by: UserId) -> Result<CompanyFunds, ServiceError> {
        let request = PostingRequest::new(FundsEntryType::Initial, amount, processed_by, self.now());
        self.post_ledger_entry(request).await
    }

    pub async fn replenish_funds(
        &self,
        amount: Money,
        description: Option<&str>,
        processed_by: UserId,
    ) -> Result<CompanyFunds, ServiceError> {
        let mut request = PostingRequest::new(FundsEntryType::Replenishment, amount, processed_by, self.now());
        request.description = description.map(str::to_string);
        self.post_ledger_entry(request).await
    }

    pub async fn record_expense(
        &self,
        amount: Money,
        description: &str,
        processed_by: UserId,
    ) -> Result<CompanyFunds, ServiceError> {
        let request = PostingRequest::new(FundsEntryType::Expense, amount, processed_by, self.now())
            .with_description(description);
        self.post_ledger_entry(request).await
    }

    pub async fn record_profit(
        &self,
        amount: Money,
        description: Option<&str>,
        processed_by: UserId,
    ) -> Result<CompanyFunds, ServiceError> {
        let mut request = PostingRequest::new(FundsEntryType::Profit, amount, processed_by, self.now());
        request.description = description.map(str::to_string);
        self.post_ledger_entry(request).await
    }

    pub async fn company_funds(&self) -> Result<CompanyFunds, ServiceError> {
        Ok(self.repos.funds.load_funds(self.currency).await?)
    }

    pub async fn funds_summary(&self) -> Result<FundsSummary, ServiceError> {
        Ok(self.company_funds().await?.summary()?)
    }

    pub async fn funds_by_type(&self) -> Result<BTreeMap<FundsEntryType, TypeTotal>, ServiceError> {
        Ok(self.company_funds().await?.by_type()?)
    }

    /// Income, expenses and net per "YYYY-MM" in the business timezone
    pub async fn funds_by_month(&self) -> Result<BTreeMap<String, MonthlyTotals>, ServiceError> {
        Ok(self.company_funds().await?.by_month(self.timezone)?)
    }

    /// Matching entries, newest first
    pub async fn funds_transactions(&self, filter: &TransactionFilter) -> Result<Vec<LedgerEntry>, ServiceError> {
        let funds = self.company_funds().await?;
        Ok(funds.transactions(filter).into_iter().cloned().collect())
    }

    /// Re-walks the whole ledger and checks every invariant
    #[instrument(skip(self))]
    pub async fn audit_funds(&self) -> Result<FundsAudit, ServiceError> {
        let funds = self.company_funds().await?;
        let problem = funds.verify().err().map(|e| e.to_string());
        let audit = FundsAudit {
            currency: funds.currency,
            entry_count: funds.history.len(),
            current_balance: funds.current_balance,
            summary: funds.summary()?,
            problem,
        };
        match &audit.problem {
            None => info!(entries = audit.entry_count, balance = %audit.current_balance, "funds ledger verified"),
            Some(problem) => warn!(entries = audit.entry_count, %problem, "funds ledger failed verification"),
        }
        Ok(audit)
    }
}
