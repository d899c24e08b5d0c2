//! Loan eligibility report

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use domain_lending::{Loan, LoanStatus};
use crate::client::Client;

/// Minimum credit score for a new loan
pub const MIN_ELIGIBLE_SCORE: u8 = 50;

/// How far back a default blocks new borrowing, measured on the due date
pub const RECENT_DEFAULT_WINDOW_DAYS: i64 = 90;

/// Why a client can or cannot take a new loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub can_take_loan: bool,
    /// Empty when `can_take_loan`
    pub reasons: Vec<String>,
    pub is_eligible: bool,
    pub open_loans: usize,
    pub recent_defaults: usize,
    pub credit_score: u8,
}

impl EligibilityReport {
    /// Assesses `client` against its own loans
    pub fn assess(client: &Client, loans: &[Loan], now: DateTime<Utc>) -> Self {
        let cutoff = now - Duration::days(RECENT_DEFAULT_WINDOW_DAYS);

        let open_loans = loans.iter().filter(|l| l.status.is_open()).count();
        let recent_defaults = loans
            .iter()
            .filter(|l| l.status == LoanStatus::Defaulted && l.due_date >= cutoff)
            .count();

        let mut reasons = Vec::new();
        if !client.is_eligible {
            reasons.push("Client is blacklisted".to_string());
        }
        if open_loans > 0 {
            reasons.push("Client has active loans".to_string());
        }
        if recent_defaults > 0 {
            reasons.push("Client has recent defaults".to_string());
        }
        if client.credit_score < MIN_ELIGIBLE_SCORE {
            reasons.push("Credit score is too low".to_string());
        }

        Self {
            can_take_loan: reasons.is_empty(),
            reasons,
            is_eligible: client.is_eligible,
            open_loans,
            recent_defaults,
            credit_score: client.credit_score,
        }
    }
}
