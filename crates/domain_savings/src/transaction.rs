//! Savings ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClientId, LoanId, Money, SavingsAccountId, SavingsTransactionId, UserId};

/// Kind of savings movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavingsTransactionType {
    Deposit,
    Withdrawal,
    Interest,
    /// Savings applied to a loan
    LoanRepayment,
}

impl SavingsTransactionType {
    /// True for types that add to the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, SavingsTransactionType::Deposit | SavingsTransactionType::Interest)
    }
}

impl fmt::Display for SavingsTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SavingsTransactionType::Deposit => "deposit",
            SavingsTransactionType::Withdrawal => "withdrawal",
            SavingsTransactionType::Interest => "interest",
            SavingsTransactionType::LoanRepayment => "loan-repayment",
        };
        f.write_str(s)
    }
}

/// How money moved in or out of the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavingsPaymentMethod {
    Cash,
    Mpesa,
    /// Internal transfer to a loan
    Savings,
    /// Interest and compensating entries
    System,
}

impl SavingsPaymentMethod {
    pub fn requires_reference(&self) -> bool {
        matches!(self, SavingsPaymentMethod::Mpesa)
    }

    /// Methods a teller may use for deposits and withdrawals
    pub fn is_teller_method(&self) -> bool {
        matches!(self, SavingsPaymentMethod::Cash | SavingsPaymentMethod::Mpesa)
    }
}

/// One appended savings movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsTransaction {
    pub id: SavingsTransactionId,
    pub account_id: SavingsAccountId,
    pub client_id: ClientId,
    pub transaction_type: SavingsTransactionType,
    pub amount: Money,
    pub payment_method: SavingsPaymentMethod,
    /// Kept only for mpesa movements
    pub transaction_id: Option<String>,
    pub processed_by: UserId,
    pub loan_id: Option<LoanId>,
    pub notes: Option<String>,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

impl SavingsTransaction {
    /// `amount` signed by the transaction's direction
    pub fn signed_amount(&self) -> Money {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

/// Teller deposit or withdrawal
#[derive(Debug, Clone)]
pub struct TellerRequest {
    pub amount: Money,
    pub method: SavingsPaymentMethod,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub processed_by: UserId,
    pub at: DateTime<Utc>,
}

impl TellerRequest {
    pub fn cash(amount: Money, processed_by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            amount,
            method: SavingsPaymentMethod::Cash,
            transaction_id: None,
            notes: None,
            processed_by,
            at,
        }
    }

    pub fn mpesa(amount: Money, transaction_id: impl Into<String>, processed_by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            amount,
            method: SavingsPaymentMethod::Mpesa,
            transaction_id: Some(transaction_id.into()),
            notes: None,
            processed_by,
            at,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
