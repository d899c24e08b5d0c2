//! Read-only views over the funds ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Money, MoneyError, TimeRange, Timezone};

use crate::entry::{FundsEntryType, LedgerEntry};
use crate::error::FundsError;
use crate::funds::CompanyFunds;

/// Count and total of one entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTotal {
    pub count: usize,
    pub total: Money,
}

/// Income and outgoings within one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub income: Money,
    pub expenses: Money,
    pub net: Money,
}

/// Headline figures for the whole ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsSummary {
    pub current_balance: Money,
    pub total_disbursed: Money,
    pub total_recovered: Money,
    pub total_profit: Money,
    pub total_expenses: Money,
    /// Every increasing entry
    pub total_income: Money,
    /// Every decreasing entry
    pub total_outgoings: Money,
    /// `total_income - total_outgoings`
    pub net_profit: Money,
    /// `(recovered - disbursed) / disbursed * 100`, two decimal places
    pub return_on_investment: Decimal,
    pub entry_count: usize,
}

/// Listing filter; every field is optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub entry_type: Option<FundsEntryType>,
    pub range: TimeRange,
}

impl TransactionFilter {
    pub fn of_type(entry_type: FundsEntryType) -> Self {
        Self {
            entry_type: Some(entry_type),
            ..Self::default()
        }
    }

    pub fn within(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.entry_type.map_or(true, |t| entry.entry_type == t) && self.range.contains(entry.transaction_date)
    }
}

impl CompanyFunds {
    pub fn by_type(&self) -> Result<BTreeMap<FundsEntryType, TypeTotal>, MoneyError> {
        let mut totals = BTreeMap::new();
        for entry in &self.history {
            let bucket = totals.entry(entry.entry_type).or_insert(TypeTotal {
                count: 0,
                total: Money::zero(self.currency),
            });
            bucket.count += 1;
            bucket.total = bucket.total.checked_add(&entry.amount)?;
        }
        Ok(totals)
    }

    /// Monthly income and outgoings keyed `YYYY-MM` in `timezone`
    pub fn by_month(&self, timezone: Timezone) -> Result<BTreeMap<String, MonthlyTotals>, MoneyError> {
        let zero = Money::zero(self.currency);
        let mut months: BTreeMap<String, MonthlyTotals> = BTreeMap::new();
        for entry in &self.history {
            let month = months
                .entry(timezone.month_key(entry.transaction_date))
                .or_insert(MonthlyTotals {
                    income: zero,
                    expenses: zero,
                    net: zero,
                });
            if entry.entry_type.is_increase() {
                month.income = month.income.checked_add(&entry.amount)?;
            } else {
                month.expenses = month.expenses.checked_add(&entry.amount)?;
            }
            month.net = month.income.checked_sub(&month.expenses)?;
        }
        Ok(months)
    }

    /// Entries dated within `range`, oldest first
    pub fn in_range(&self, range: TimeRange) -> Vec<&LedgerEntry> {
        self.history
            .iter()
            .filter(|e| range.contains(e.transaction_date))
            .collect()
    }

    pub fn summary(&self) -> Result<FundsSummary, MoneyError> {
        let mut income = Money::zero(self.currency);
        let mut outgoings = Money::zero(self.currency);
        for entry in &self.history {
            if entry.entry_type.is_increase() {
                income = income.checked_add(&entry.amount)?;
            } else {
                outgoings = outgoings.checked_add(&entry.amount)?;
            }
        }

        let disbursed = self.total_disbursed.amount();
        let roi = if disbursed > Decimal::ZERO {
            ((self.total_recovered.amount() - disbursed) / disbursed * dec!(100)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(FundsSummary {
            current_balance: self.current_balance,
            total_disbursed: self.total_disbursed,
            total_recovered: self.total_recovered,
            total_profit: self.total_profit,
            total_expenses: self.total_expenses,
            total_income: income,
            total_outgoings: outgoings,
            net_profit: income.checked_sub(&outgoings)?,
            return_on_investment: roi,
            entry_count: self.history.len(),
        })
    }

    /// Entries matching `filter`, newest first
    pub fn transactions(&self, filter: &TransactionFilter) -> Vec<&LedgerEntry> {
        let mut entries: Vec<&LedgerEntry> = self.history.iter().filter(|e| filter.matches(e)).collect();
        entries.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        entries
    }

    /// Re-walks the history and checks every balance invariant
    ///
    /// - each entry starts where the previous one ended
    /// - each entry moves the balance by its signed amount
    /// - no balance is negative
    /// - the current balance and running totals match the history
    pub fn verify(&self) -> Result<(), FundsError> {
        let mut expected = CompanyFunds::new(self.currency);
        let mut last_date: Option<DateTime<Utc>> = None;

        for (index, entry) in self.history.iter().enumerate() {
            if entry.previous_balance != expected.current_balance {
                return Err(FundsError::inconsistent(
                    index,
                    format!(
                        "previous balance {} but running balance is {}",
                        entry.previous_balance, expected.current_balance
                    ),
                ));
            }
            if entry.new_balance.is_negative() {
                return Err(FundsError::inconsistent(index, "negative balance"));
            }
            if !entry.amount.is_positive() {
                return Err(FundsError::inconsistent(index, "non-positive amount"));
            }
            if index > 0 && entry.entry_type == FundsEntryType::Initial {
                return Err(FundsError::inconsistent(index, "initial entry after the first"));
            }
            expected
                .apply(entry.clone())
                .map_err(|e| FundsError::inconsistent(index, e.to_string()))?;
            last_date = Some(entry.transaction_date);
        }

        let checks = [
            ("current balance", self.current_balance, expected.current_balance),
            ("total disbursed", self.total_disbursed, expected.total_disbursed),
            ("total recovered", self.total_recovered, expected.total_recovered),
            ("total profit", self.total_profit, expected.total_profit),
            ("total expenses", self.total_expenses, expected.total_expenses),
        ];
        for (name, stored, derived) in checks {
            if stored != derived {
                return Err(FundsError::inconsistent(
                    self.history.len(),
                    format!("{} is {} but history gives {}", name, stored, derived),
                ));
            }
        }

        tracing::debug!(entries = self.history.len(), last = ?last_date, "funds ledger verified");
        Ok(())
    }
}
