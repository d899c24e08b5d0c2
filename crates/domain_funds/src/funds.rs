//! Company funds aggregate
//!
//! A single running balance backed by an append-only history. Posting is two
//! steps so a storage adapter can persist the entry between them:
//!
//! 1. [`CompanyFunds::prepare`] validates a request against the current
//!    balance and returns the entry that would be appended, without touching
//!    the aggregate.
//! 2. [`CompanyFunds::apply`] appends a prepared entry and moves the totals.
//!
//! [`CompanyFunds::post`] does both for in-memory use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, LedgerEntryId, LoanId, Money, PaymentId, UserId};

use crate::entry::{
    default_description, disbursement_description, repayment_description, FundsEntryType, LedgerEntry,
    PostingRequest,
};
use crate::error::FundsError;

/// Running totals of the company cash position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFunds {
    pub currency: Currency,
    pub current_balance: Money,
    pub total_disbursed: Money,
    pub total_recovered: Money,
    pub total_profit: Money,
    pub total_expenses: Money,
    /// Oldest first
    pub history: Vec<LedgerEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanyFunds {
    /// An empty ledger
    pub fn new(currency: Currency) -> Self {
        let zero = Money::zero(currency);
        Self {
            currency,
            current_balance: zero,
            total_disbursed: zero,
            total_recovered: zero,
            total_profit: zero,
            total_expenses: zero,
            history: Vec::new(),
            updated_at: None,
        }
    }

    /// Rebuilds the aggregate by replaying `history` from an empty ledger
    pub fn replay(currency: Currency, history: Vec<LedgerEntry>) -> Result<Self, FundsError> {
        let mut funds = Self::new(currency);
        for entry in history {
            funds.apply(entry)?;
        }
        Ok(funds)
    }

    pub fn is_initialized(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn last_entry(&self) -> Option<&LedgerEntry> {
        self.history.last()
    }

    /// Validates `request` and builds the entry it would append
    ///
    /// Nothing is mutated; a rejected request leaves the ledger as it was.
    pub fn prepare(&self, request: PostingRequest) -> Result<LedgerEntry, FundsError> {
        self.current_balance.ensure_same_currency(&request.amount)?;
        if !request.amount.is_positive() {
            return Err(FundsError::validation("Amount must be greater than zero"));
        }

        let description = match request.description.map(|d| d.trim().to_string()) {
            Some(d) if !d.is_empty() => d,
            _ => default_description(request.entry_type)
                .map(str::to_string)
                .ok_or_else(|| FundsError::validation("Description is required for expenses"))?,
        };

        if request.entry_type == FundsEntryType::Initial && self.is_initialized() {
            return Err(FundsError::AlreadyInitialized);
        }

        let new_balance = self.current_balance.checked_add(&request.entry_type.signed(request.amount))?;
        if new_balance.is_negative() {
            return Err(FundsError::InsufficientFunds {
                available: self.current_balance.to_string(),
                requested: request.amount.to_string(),
            });
        }

        Ok(LedgerEntry {
            id: LedgerEntryId::new_v7(),
            entry_type: request.entry_type,
            amount: request.amount,
            previous_balance: self.current_balance,
            new_balance,
            description,
            loan_id: request.loan_id,
            payment_id: request.payment_id,
            processed_by: request.processed_by,
            transaction_date: request.transaction_date,
        })
    }

    /// Appends a prepared entry and updates the running totals
    ///
    /// Fails with `StaleEntry` if the entry was prepared against a balance
    /// other than the current one.
    pub fn apply(&mut self, entry: LedgerEntry) -> Result<(), FundsError> {
        if entry.previous_balance != self.current_balance {
            return Err(FundsError::StaleEntry {
                expected: entry.previous_balance.to_string(),
                actual: self.current_balance.to_string(),
            });
        }
        let expected = self.current_balance.checked_add(&entry.signed_amount())?;
        if expected != entry.new_balance {
            return Err(FundsError::inconsistent(
                self.history.len(),
                format!("new balance {} does not follow from {}", entry.new_balance, expected),
            ));
        }

        match entry.entry_type {
            FundsEntryType::LoanDisbursement => {
                self.total_disbursed = self.total_disbursed.checked_add(&entry.amount)?;
            }
            FundsEntryType::LoanRepayment => {
                self.total_recovered = self.total_recovered.checked_add(&entry.amount)?;
            }
            FundsEntryType::Profit => {
                self.total_profit = self.total_profit.checked_add(&entry.amount)?;
            }
            FundsEntryType::Expense => {
                self.total_expenses = self.total_expenses.checked_add(&entry.amount)?;
            }
            FundsEntryType::Initial | FundsEntryType::Replenishment => {}
        }

        self.current_balance = entry.new_balance;
        self.updated_at = Some(entry.transaction_date);
        self.history.push(entry);
        Ok(())
    }

    /// Validates and appends in one step
    pub fn post(&mut self, request: PostingRequest) -> Result<&LedgerEntry, FundsError> {
        let entry = self.prepare(request)?;
        self.apply(entry)?;
        self.history
            .last()
            .ok_or_else(|| FundsError::inconsistent(0, "entry missing after append"))
    }

    pub fn initialize(&mut self, amount: Money, by: UserId, at: DateTime<Utc>) -> Result<&LedgerEntry, FundsError> {
        self.post(PostingRequest::new(FundsEntryType::Initial, amount, by, at))
    }

    pub fn replenish(
        &mut self,
        amount: Money,
        description: Option<&str>,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, FundsError> {
        let mut request = PostingRequest::new(FundsEntryType::Replenishment, amount, by, at);
        request.description = description.map(str::to_string);
        self.post(request)
    }

    pub fn record_disbursement(
        &mut self,
        amount: Money,
        loan_id: LoanId,
        loan_number: &str,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, FundsError> {
        self.post(
            PostingRequest::new(FundsEntryType::LoanDisbursement, amount, by, at)
                .with_description(disbursement_description(loan_number))
                .with_loan(loan_id),
        )
    }

    pub fn record_repayment(
        &mut self,
        amount: Money,
        loan_id: LoanId,
        loan_number: &str,
        payment_id: Option<PaymentId>,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, FundsError> {
        let mut request = PostingRequest::new(FundsEntryType::LoanRepayment, amount, by, at)
            .with_description(repayment_description(loan_number))
            .with_loan(loan_id);
        request.payment_id = payment_id;
        self.post(request)
    }

    pub fn record_expense(
        &mut self,
        amount: Money,
        description: &str,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, FundsError> {
        self.post(PostingRequest::new(FundsEntryType::Expense, amount, by, at).with_description(description))
    }

    pub fn record_profit(
        &mut self,
        amount: Money,
        description: Option<&str>,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&LedgerEntry, FundsError> {
        let mut request = PostingRequest::new(FundsEntryType::Profit, amount, by, at);
        request.description = description.map(str::to_string);
        self.post(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn kes(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    fn funded(units: i64) -> CompanyFunds {
        let mut funds = CompanyFunds::new(Currency::KES);
        funds.initialize(kes(units), UserId::new(), at()).unwrap();
        funds
    }

    #[test]
    fn test_initialize_once() {
        let mut funds = funded(1000);
        assert_eq!(funds.current_balance, kes(1000));
        assert_eq!(funds.history[0].description, "Initial company funds setup");

        let again = funds.initialize(kes(10), UserId::new(), at());
        assert!(matches!(again, Err(FundsError::AlreadyInitialized)));
        assert_eq!(funds.history.len(), 1);
    }

    #[test]
    fn test_disbursement_beyond_balance_leaves_ledger_untouched() {
        let mut funds = funded(500);
        let before = funds.clone();

        let result = funds.record_disbursement(kes(600), LoanId::new(), "LN-2025-000001", UserId::new(), at());

        assert!(matches!(result, Err(FundsError::InsufficientFunds { .. })));
        assert_eq!(funds, before);
    }

    #[test]
    fn test_totals_follow_entry_type() {
        let mut funds = funded(10_000);
        let loan = LoanId::new();
        funds.record_disbursement(kes(4000), loan, "LN-2025-000001", UserId::new(), at()).unwrap();
        funds.record_repayment(kes(1500), loan, "LN-2025-000001", None, UserId::new(), at()).unwrap();
        funds.record_expense(kes(200), "Office rent", UserId::new(), at()).unwrap();
        funds.record_profit(kes(300), None, UserId::new(), at()).unwrap();
        funds.replenish(kes(1000), None, UserId::new(), at()).unwrap();

        assert_eq!(funds.total_disbursed, kes(4000));
        assert_eq!(funds.total_recovered, kes(1500));
        assert_eq!(funds.total_expenses, kes(200));
        assert_eq!(funds.total_profit, kes(300));
        assert_eq!(funds.current_balance, kes(8600));
        assert_eq!(funds.history[1].description, "Loan disbursement for LN-2025-000001");
        assert_eq!(funds.history[2].description, "Loan repayment for LN-2025-000001");
        assert_eq!(funds.history[5].description, "Funds replenishment");
    }

    #[test]
    fn test_expense_requires_description() {
        let mut funds = funded(1000);
        let result = funds.record_expense(kes(10), "  ", UserId::new(), at());
        assert!(matches!(result, Err(FundsError::Validation(_))));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let mut funds = funded(1000);
        assert!(funds.replenish(Money::zero(Currency::KES), None, UserId::new(), at()).is_err());
        assert!(funds.record_profit(kes(-5), None, UserId::new(), at()).is_err());
    }

    #[test]
    fn test_stale_entry_rejected() {
        let mut funds = funded(1000);
        let first = funds
            .prepare(PostingRequest::new(FundsEntryType::Replenishment, kes(100), UserId::new(), at()))
            .unwrap();
        let second = funds
            .prepare(PostingRequest::new(FundsEntryType::Replenishment, kes(50), UserId::new(), at()))
            .unwrap();

        funds.apply(first).unwrap();
        assert!(matches!(funds.apply(second), Err(FundsError::StaleEntry { .. })));
        assert_eq!(funds.current_balance, kes(1100));
    }

    #[test]
    fn test_replay_rebuilds_totals() {
        let mut funds = funded(2000);
        funds.record_expense(kes(250), "Fuel", UserId::new(), at()).unwrap();

        let rebuilt = CompanyFunds::replay(Currency::KES, funds.history.clone()).unwrap();
        assert_eq!(rebuilt, funds);
    }
}
