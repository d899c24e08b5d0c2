//! Lending Service
//!
//! Application services over the lending aggregates. [`LendingCore`] is the
//! single entry point:
//!
//! - every read-modify-write runs under a per-aggregate lock ([`locks`])
//! - the primary aggregate change commits first; ledger posts and client
//!   counter updates that fail afterwards become [`ReconciliationRecord`]s
//! - configuration comes from `LENDING_*` variables ([`config`])
//!
//! # Example
//!
//! ```rust
//! use core_kernel::{Currency, Money, UserId};
//! use lending_service::{LendingConfig, LendingCore, ServiceError};
//!
//! # async fn run() -> Result<(), ServiceError> {
//! let core = LendingCore::in_memory(&LendingConfig::default());
//! let admin = UserId::new();
//! core.initialize_funds(Money::from_major(500, Currency::KES), admin).await?;
//!
//! let summary = core.funds_summary().await?;
//! assert_eq!(summary.current_balance, Money::from_major(500, Currency::KES));
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod config;
pub mod error;
pub mod funds;
pub mod loans;
pub mod locks;
pub mod payments;
pub mod reconciliation;
pub mod reports;
pub mod savings;
pub mod service;
pub mod telemetry;

pub use crate::config::{LendingConfig, LogFormat};
pub use error::{ErrorKind, ServiceError};
pub use funds::FundsAudit;
pub use loans::{CreateLoanRequest, DisburseRequest};
pub use locks::{AggregateGuard, AggregateKey, AggregateLocks};
pub use payments::RecordPaymentRequest;
pub use reconciliation::{
    InMemoryReconciliationLog, ReconciliationOperation, ReconciliationPort, ReconciliationRecord,
};
pub use savings::SavingsMovementRequest;
pub use service::{LendingCore, Repositories};
