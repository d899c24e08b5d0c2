//! Company funds errors

use thiserror::Error;

use core_kernel::MoneyError;

/// Errors that can occur when posting to or auditing the funds ledger
#[derive(Debug, Error)]
pub enum FundsError {
    /// A decreasing entry would take the balance below zero
    #[error("Insufficient company funds for this transaction (available {available}, requested {requested})")]
    InsufficientFunds { available: String, requested: String },

    #[error("Invalid ledger entry: {0}")]
    Validation(String),

    /// `initial` can only be the first entry
    #[error("Company funds are already initialized")]
    AlreadyInitialized,

    /// The entry was prepared against a balance that has since moved
    #[error("Stale ledger entry: expected previous balance {expected}, ledger is at {actual}")]
    StaleEntry { expected: String, actual: String },

    /// `verify` found a broken invariant
    #[error("Ledger inconsistency at entry {index}: {message}")]
    Inconsistent { index: usize, message: String },

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl FundsError {
    pub fn validation(message: impl Into<String>) -> Self {
        FundsError::Validation(message.into())
    }

    pub fn inconsistent(index: usize, message: impl Into<String>) -> Self {
        FundsError::Inconsistent {
            index,
            message: message.into(),
        }
    }
}
