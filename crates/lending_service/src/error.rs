//! Service errors
//!
//! Domain and port errors pass through unchanged; [`ServiceError::kind`]
//! sorts them into the categories callers act on.

use thiserror::Error;

use core_kernel::{MoneyError, PortError};
use domain_client::ClientError;
use domain_funds::FundsError;
use domain_lending::LendingError;
use domain_savings::SavingsError;
use infra_db::DatabaseError;

/// Errors returned by the lending core
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Lending(#[from] LendingError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Funds(#[from] FundsError),

    #[error(transparent)]
    Savings(#[from] SavingsError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Request-level checks made by the service itself
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// What went wrong, independent of which layer noticed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-policy input
    Validation,
    /// A state machine rule was violated
    InvalidTransition,
    /// A payment against an undisbursed or closed loan
    InvalidLoanState,
    /// A ledger balance would go negative
    InsufficientFunds,
    NotFound,
    /// Blacklisted, or already holding an open loan
    IneligibleClient,
    /// Concurrent writers collided
    Conflict,
    Internal,
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Lending(error) => match error {
                LendingError::InvalidStatusTransition { .. } | LendingError::PaymentNotReversible { .. } => {
                    ErrorKind::InvalidTransition
                }
                LendingError::InvalidLoanState { .. } => ErrorKind::InvalidLoanState,
                LendingError::Validation(_)
                | LendingError::ItemUnavailable(_)
                | LendingError::Money(_)
                | LendingError::Temporal(_) => ErrorKind::Validation,
            },
            ServiceError::Client(error) => match error {
                ClientError::Ineligible { .. } => ErrorKind::IneligibleClient,
                ClientError::Validation(_) | ClientError::InvalidCreditScore(_) => ErrorKind::Validation,
            },
            ServiceError::Funds(error) => match error {
                FundsError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                FundsError::StaleEntry { .. } => ErrorKind::Conflict,
                FundsError::Inconsistent { .. } => ErrorKind::Internal,
                FundsError::Validation(_) | FundsError::AlreadyInitialized | FundsError::Money(_) => {
                    ErrorKind::Validation
                }
            },
            ServiceError::Savings(error) => match error {
                SavingsError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                SavingsError::Validation(_)
                | SavingsError::Inactive { .. }
                | SavingsError::NothingToAccrue(_)
                | SavingsError::Money(_) => ErrorKind::Validation,
            },
            ServiceError::Port(error) => match error {
                PortError::NotFound { .. } => ErrorKind::NotFound,
                PortError::Validation { .. } => ErrorKind::Validation,
                PortError::Conflict { .. } => ErrorKind::Conflict,
                _ => ErrorKind::Internal,
            },
            ServiceError::Money(_) | ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Database(_) | ServiceError::Config(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let insufficient: ServiceError = FundsError::InsufficientFunds {
            available: "KSh 500.00".into(),
            requested: "KSh 600.00".into(),
        }
        .into();
        assert_eq!(insufficient.kind(), ErrorKind::InsufficientFunds);

        let transition: ServiceError = LendingError::transition("pending", "active").into();
        assert_eq!(transition.kind(), ErrorKind::InvalidTransition);

        let ineligible: ServiceError = ClientError::ineligible("Jane Wanjiru", "blacklisted").into();
        assert_eq!(ineligible.kind(), ErrorKind::IneligibleClient);

        let missing: ServiceError = PortError::not_found("Loan", "LN-1").into();
        assert!(missing.is_not_found());

        let savings: ServiceError = SavingsError::InsufficientFunds {
            available: "1".into(),
            requested: "2".into(),
        }
        .into();
        assert_eq!(savings.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn test_domain_message_passes_through() {
        let error: ServiceError = FundsError::validation("Expense description is required").into();
        assert!(error.to_string().contains("Expense description is required"));
    }
}
