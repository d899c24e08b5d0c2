//! Core Kernel - Foundational types for the lending back office
//!
//! This crate provides the building blocks shared by every domain crate:
//! - Money types with precise decimal arithmetic and ceiling rounding
//! - Temporal helpers: duration units, whole-day arithmetic, business timezone, clocks
//! - Strongly-typed identifiers
//! - Port infrastructure for swappable persistence adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use temporal::{
    Clock, DurationUnit, FixedClock, SharedClock, SystemClock, TemporalError, TimeRange, Timezone,
    whole_days_between,
};
pub use identifiers::{
    ClientId, UserId, LoanId, PaymentId, InterestPlanId, ItemId,
    LedgerEntryId, SavingsAccountId, SavingsTransactionId, ReconciliationId,
};
pub use ports::{
    PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable,
};
