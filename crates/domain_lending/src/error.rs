//! Lending domain errors

use thiserror::Error;

use core_kernel::{MoneyError, TemporalError};

/// Errors that can occur in the lending domain
#[derive(Debug, Error)]
pub enum LendingError {
    /// Input is malformed or outside the plan's policy
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The loan state machine does not allow the requested move
    #[error("Invalid loan status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A repayment or deposit was attempted against a loan that cannot take it
    #[error("Loan {loan_number} is {status}: {message}")]
    InvalidLoanState {
        loan_number: String,
        status: String,
        message: String,
    },

    /// Only completed payments can be reversed
    #[error("Payment {payment_number} cannot be reversed from status {status}")]
    PaymentNotReversible {
        payment_number: String,
        status: String,
    },

    /// The financed item is inactive or out of stock
    #[error("Item unavailable: {0}")]
    ItemUnavailable(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Date error: {0}")]
    Temporal(#[from] TemporalError),
}

impl LendingError {
    pub fn validation(message: impl Into<String>) -> Self {
        LendingError::Validation(message.into())
    }

    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        LendingError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
