//! Savings Domain
//!
//! Interest-bearing client savings. Each [`SavingsAccount`] carries its own
//! append-only history of [`SavingsTransaction`]s; the balance always equals
//! the signed sum of that history and never goes negative.

pub mod account;
pub mod error;
pub mod ports;
pub mod stats;
pub mod transaction;

pub use account::{generate_savings_number, simple_interest, SavingsAccount};
pub use error::SavingsError;
pub use ports::SavingsPort;
pub use stats::{SavingsBucket, SavingsStats, TopSavingsAccount, TOP_ACCOUNTS};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockSavingsPort;
pub use transaction::{SavingsPaymentMethod, SavingsTransaction, SavingsTransactionType, TellerRequest};
