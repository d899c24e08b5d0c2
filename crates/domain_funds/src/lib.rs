//! Company Funds Domain
//!
//! The company's cash position as an append-only ledger. Every balance
//! movement is a [`LedgerEntry`] carrying the balance before and after it,
//! so the history can be re-walked and audited with [`CompanyFunds::verify`].
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use core_kernel::{Currency, LoanId, Money, UserId};
//! use domain_funds::{CompanyFunds, FundsError};
//!
//! let kes = |n| Money::from_major(n, Currency::KES);
//! let mut funds = CompanyFunds::new(Currency::KES);
//! funds.initialize(kes(500), UserId::new(), Utc::now()).unwrap();
//!
//! let result = funds.record_disbursement(kes(600), LoanId::new(), "LN-2025-000001", UserId::new(), Utc::now());
//! assert!(matches!(result, Err(FundsError::InsufficientFunds { .. })));
//! assert_eq!(funds.current_balance, kes(500));
//! ```

pub mod entry;
pub mod error;
pub mod funds;
pub mod ports;
pub mod reports;

pub use entry::{
    disbursement_description, disbursement_rollback_description, repayment_description, reversal_description, FundsEntryType, LedgerEntry,
    PostingRequest,
};
pub use error::FundsError;
pub use funds::CompanyFunds;
pub use ports::FundsLedgerPort;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockFundsLedgerPort;
pub use reports::{FundsSummary, MonthlyTotals, TransactionFilter, TypeTotal};
