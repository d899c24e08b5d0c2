//! Lending Domain
//!
//! Money loans and asset (item) financing:
//!
//! - **Interest plans** carry the pricing policy a loan snapshots at origination
//! - **Calculator** turns a plan, principal and term into [`LoanTerms`]
//! - **Loan** is the aggregate and its status state machine
//! - **Payment** records repayments, their lateness and reversal
//! - **Stats** are read-only portfolio and collections summaries
//!
//! # Example
//!
//! ```rust
//! use domain_lending::{calculate_terms, InterestPlan, ItemType, PaymentFrequency};
//! use core_kernel::{Currency, Money};
//! use rust_decimal::Decimal;
//! use rust_decimal_macros::dec;
//!
//! let plan = InterestPlan::new("Daily 10%", ItemType::Money, PaymentFrequency::Daily, dec!(10), Currency::KES);
//! let terms = calculate_terms(&plan, Money::from_major(1000, Currency::KES), 30, Decimal::ZERO).unwrap();
//!
//! assert_eq!(terms.total, Money::from_major(1100, Currency::KES));
//! assert_eq!(terms.installment, Money::from_major(37, Currency::KES));
//! ```

pub mod calculator;
pub mod error;
pub mod item;
pub mod loan;
pub mod payment;
pub mod plan;
pub mod ports;
pub mod stats;

pub use calculator::{calculate_terms, compute_terms, due_date, LoanTerms};
pub use error::LendingError;
pub use item::Item;
pub use loan::{
    DisbursementDetails, DisbursementMethod, Loan, LoanApplication, LoanStatus, MissedPayments,
    PaymentHistoryEntry, RepaymentOutcome, ReversalOutcome,
};
pub use payment::{assess_lateness, document_number, Lateness, Payment, PaymentMethod, PaymentStatus};
pub use plan::{duration_in_days, InterestPlan, ItemType, PaymentFrequency};
pub use ports::{InterestPlanPort, ItemPort, LoanPort, LoanQuery, PaymentPort, PaymentQuery};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{MockInterestPlanPort, MockItemPort, MockLoanPort, MockPaymentPort};
pub use stats::{LoanStats, PaymentBucket, PaymentStats};
