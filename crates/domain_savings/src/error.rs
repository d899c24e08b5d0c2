//! Savings domain errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur on a savings account
#[derive(Debug, Error)]
pub enum SavingsError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A debit larger than the account balance
    #[error("Insufficient savings balance. Available: {available}, requested: {requested}")]
    InsufficientFunds { available: String, requested: String },

    /// Deposits and withdrawals need an active account
    #[error("Savings account {savings_number} is inactive")]
    Inactive { savings_number: String },

    /// Interest was requested before a full day elapsed, or at a zero rate
    #[error("No interest to accrue: {0}")]
    NothingToAccrue(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl SavingsError {
    pub fn validation(message: impl Into<String>) -> Self {
        SavingsError::Validation(message.into())
    }

    pub fn nothing_to_accrue(message: impl Into<String>) -> Self {
        SavingsError::NothingToAccrue(message.into())
    }
}
