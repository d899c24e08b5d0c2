//! Test Utilities Crate
//!
//! Shared test infrastructure for the lending core test suites.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built plans, items, money and dates
//! - `builders`: Builders for clients and loans at any lifecycle stage
//! - `database`: PostgreSQL containers for adapter tests
//! - `assertions`: Invariant checks with readable failure messages
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
