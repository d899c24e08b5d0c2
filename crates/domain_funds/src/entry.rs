//! Ledger entries
//!
//! An entry is immutable once appended. Its type fixes the direction of the
//! balance movement:
//!
//! | Type                | Direction |
//! |---------------------|-----------|
//! | `initial`           | +         |
//! | `replenishment`     | +         |
//! | `loan-repayment`    | +         |
//! | `profit`            | +         |
//! | `loan-disbursement` | -         |
//! | `expense`           | -         |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{LedgerEntryId, LoanId, Money, PaymentId, UserId};
use crate::error::FundsError;

/// Kind of balance movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FundsEntryType {
    Initial,
    Replenishment,
    LoanDisbursement,
    LoanRepayment,
    Expense,
    Profit,
}

impl FundsEntryType {
    /// True for types that add to the balance
    pub fn is_increase(&self) -> bool {
        matches!(
            self,
            FundsEntryType::Initial
                | FundsEntryType::Replenishment
                | FundsEntryType::LoanRepayment
                | FundsEntryType::Profit
        )
    }

    /// `amount` with the sign this type applies to the balance
    pub fn signed(&self, amount: Money) -> Money {
        if self.is_increase() {
            amount
        } else {
            -amount
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundsEntryType::Initial => "initial",
            FundsEntryType::Replenishment => "replenishment",
            FundsEntryType::LoanDisbursement => "loan-disbursement",
            FundsEntryType::LoanRepayment => "loan-repayment",
            FundsEntryType::Expense => "expense",
            FundsEntryType::Profit => "profit",
        }
    }

    pub fn all() -> [FundsEntryType; 6] {
        [
            FundsEntryType::Initial,
            FundsEntryType::Replenishment,
            FundsEntryType::LoanDisbursement,
            FundsEntryType::LoanRepayment,
            FundsEntryType::Expense,
            FundsEntryType::Profit,
        ]
    }
}

impl fmt::Display for FundsEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundsEntryType {
    type Err = FundsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FundsEntryType::all()
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FundsError::validation(format!("unknown entry type '{}'", s)))
    }
}

/// Request to post one entry
#[derive(Debug, Clone)]
pub struct PostingRequest {
    pub entry_type: FundsEntryType,
    pub amount: Money,
    /// Falls back to the type's default description when absent
    pub description: Option<String>,
    pub loan_id: Option<LoanId>,
    pub payment_id: Option<PaymentId>,
    pub processed_by: UserId,
    pub transaction_date: DateTime<Utc>,
}

impl PostingRequest {
    pub fn new(entry_type: FundsEntryType, amount: Money, processed_by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            entry_type,
            amount,
            description: None,
            loan_id: None,
            payment_id: None,
            processed_by,
            transaction_date: at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_loan(mut self, loan_id: LoanId) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn with_payment(mut self, payment_id: PaymentId) -> Self {
        self.payment_id = Some(payment_id);
        self
    }
}

/// One appended balance event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub entry_type: FundsEntryType,
    pub amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub description: String,
    pub loan_id: Option<LoanId>,
    pub payment_id: Option<PaymentId>,
    pub processed_by: UserId,
    pub transaction_date: DateTime<Utc>,
}

impl LedgerEntry {
    /// `amount` signed by the entry's direction
    pub fn signed_amount(&self) -> Money {
        self.entry_type.signed(self.amount)
    }
}

/// Description used for a loan disbursement entry
pub fn disbursement_description(loan_number: &str) -> String {
    format!("Loan disbursement for {}", loan_number)
}

/// Description used when a disbursement is paid back into the funds
/// because the loan could not be saved
pub fn disbursement_rollback_description(loan_number: &str) -> String {
    format!("Disbursement for {} returned, loan not saved", loan_number)
}

/// Description used for a loan repayment entry
pub fn repayment_description(loan_number: &str) -> String {
    format!("Loan repayment for {}", loan_number)
}

/// Description used for a payment reversal entry
pub fn reversal_description(payment_number: &str) -> String {
    format!("Reversal of payment {}", payment_number)
}

pub(crate) fn default_description(entry_type: FundsEntryType) -> Option<&'static str> {
    match entry_type {
        FundsEntryType::Initial => Some("Initial company funds setup"),
        FundsEntryType::Replenishment => Some("Funds replenishment"),
        FundsEntryType::Profit => Some("Company profit"),
        FundsEntryType::LoanDisbursement => Some("Loan disbursement"),
        FundsEntryType::LoanRepayment => Some("Loan repayment"),
        FundsEntryType::Expense => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_rule() {
        let increases: Vec<_> = FundsEntryType::all().into_iter().filter(|t| t.is_increase()).collect();
        assert_eq!(
            increases,
            vec![
                FundsEntryType::Initial,
                FundsEntryType::Replenishment,
                FundsEntryType::LoanRepayment,
                FundsEntryType::Profit,
            ]
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for t in FundsEntryType::all() {
            assert_eq!(t.as_str().parse::<FundsEntryType>().unwrap(), t);
        }
        assert!("refund".parse::<FundsEntryType>().is_err());
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&FundsEntryType::LoanDisbursement).unwrap();
        assert_eq!(json, "\"loan-disbursement\"");
    }
}
