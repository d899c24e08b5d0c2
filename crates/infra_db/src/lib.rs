//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the company funds ledger using SQLx:
//!
//! - [`pool`] connection pool settings and migrations
//! - [`funds_ledger`] the `FundsLedgerPort` adapter over a materialized
//!   totals row and an append-only entry table
//!
//! Queries are checked at runtime so the workspace builds without a live
//! database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresFundsLedger};
//!
//! let pool = create_pool(&DatabaseConfig::new("postgres://localhost/lending")).await?;
//! run_migrations(&pool).await?;
//! let ledger = PostgresFundsLedger::new(pool);
//! ```

pub mod error;
pub mod funds_ledger;
pub mod pool;

pub use error::DatabaseError;
pub use funds_ledger::PostgresFundsLedger;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
