//! Client Domain
//!
//! Borrower profiles and everything derived from a borrower's history:
//!
//! - **Client** identity, lending counters and blacklisting
//! - **Eligibility** report with human-readable reasons
//! - **Scoring**, the credit scoring engine and its configurable policy
//! - **Performance** analytics (risk level, consistency, trend)

pub mod client;
pub mod eligibility;
pub mod error;
pub mod performance;
pub mod ports;
pub mod scoring;

pub use client::{Address, Client, EmergencyContact, NewClient, Relationship, MAX_CREDIT_SCORE};
pub use eligibility::{EligibilityReport, MIN_ELIGIBLE_SCORE, RECENT_DEFAULT_WINDOW_DAYS};
pub use error::ClientError;
pub use performance::{
    ClientPerformance, ImprovementTrend, PaymentConsistency, PerformanceFinancials, PerformanceSummary,
    PerformanceTrends, RiskLevel,
};
pub use ports::ClientPort;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClientPort;
pub use scoring::{CreditScorer, ScoreBreakdown, ScoringPolicy, UtilizationBand};
