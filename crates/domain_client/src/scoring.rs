//! Credit Scoring Engine
//!
//! Recomputes a client's score from the full loan and payment history. The
//! result depends only on the history and `now`, never on the previous
//! score, so recomputing without new activity is a no-op.
//!
//! Starting from 100, five factor scores are blended in turn:
//!
//! | Factor          | Weight | Score                                        |
//! |-----------------|--------|----------------------------------------------|
//! | payment history | 40%    | on-time ratio, minus lateness penalties      |
//! | defaults        | 25%    | 100 - default rate                           |
//! | utilization     | 15%    | banded share of an estimated credit limit    |
//! | history length  | 10%    | 50 + 2 per 30 days since first loan, pro rata|
//! | recent activity | 10%    | on-time ratio over the last 180 days         |
//!
//! Each blend is `score * (1 - w) + factor * w`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use domain_lending::{Loan, LoanStatus, Payment};

/// One utilization band: ratios up to `max_ratio` score `score`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationBand {
    pub max_ratio: Decimal,
    pub score: Decimal,
}

/// Weights, penalties and windows of the scoring algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub payment_history_weight: Decimal,
    pub default_weight: Decimal,
    pub utilization_weight: Decimal,
    pub history_length_weight: Decimal,
    pub recent_activity_weight: Decimal,

    /// Late days above which a payment counts as severely late
    pub severe_late_days: u32,
    pub severe_late_penalty: Decimal,
    /// Late days above which a payment counts as moderately late
    pub moderate_late_days: u32,
    pub moderate_late_penalty: Decimal,

    /// Smallest credit limit assumed for utilization
    pub utilization_floor_limit: Decimal,
    /// Credit limit as a multiple of the open exposure
    pub utilization_limit_multiplier: Decimal,
    /// Ascending by `max_ratio`
    pub utilization_bands: Vec<UtilizationBand>,
    /// Score above the last band
    pub utilization_overflow_score: Decimal,

    pub history_base_score: Decimal,
    pub history_points_per_period: Decimal,
    pub history_period_days: i64,

    pub recent_window_days: i64,
    /// Score when there was no activity in the window
    pub recent_idle_score: Decimal,

    /// Applied on completion when the loan never recorded lateness
    pub clean_completion_bonus: i32,
    /// Applied on completion otherwise
    pub late_completion_penalty: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            payment_history_weight: dec!(0.40),
            default_weight: dec!(0.25),
            utilization_weight: dec!(0.15),
            history_length_weight: dec!(0.10),
            recent_activity_weight: dec!(0.10),
            severe_late_days: 30,
            severe_late_penalty: dec!(10),
            moderate_late_days: 7,
            moderate_late_penalty: dec!(5),
            utilization_floor_limit: dec!(50000),
            utilization_limit_multiplier: dec!(2),
            utilization_bands: vec![
                UtilizationBand { max_ratio: dec!(0.3), score: dec!(100) },
                UtilizationBand { max_ratio: dec!(0.5), score: dec!(80) },
                UtilizationBand { max_ratio: dec!(0.7), score: dec!(60) },
                UtilizationBand { max_ratio: dec!(0.9), score: dec!(40) },
            ],
            utilization_overflow_score: dec!(20),
            history_base_score: dec!(50),
            history_points_per_period: dec!(2),
            history_period_days: 30,
            recent_window_days: 180,
            recent_idle_score: dec!(70),
            clean_completion_bonus: 5,
            late_completion_penalty: -2,
        }
    }
}

impl ScoringPolicy {
    /// Score change applied when a loan completes
    pub fn completion_adjustment(&self, clean_history: bool) -> i32 {
        if clean_history {
            self.clean_completion_bonus
        } else {
            self.late_completion_penalty
        }
    }
}

/// Factor scores behind a computed credit score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub payment_history: Decimal,
    pub defaults: Decimal,
    pub utilization: Decimal,
    pub history_length: Decimal,
    pub recent_activity: Decimal,
    pub score: u8,
}

/// Computes credit scores under a policy
#[derive(Debug, Clone, Default)]
pub struct CreditScorer {
    policy: ScoringPolicy,
}

impl CreditScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Final score in 0..=100
    pub fn score(&self, loans: &[Loan], payments: &[Payment], now: DateTime<Utc>) -> u8 {
        self.breakdown(loans, payments, now).score
    }

    /// Final score together with each factor
    pub fn breakdown(&self, loans: &[Loan], payments: &[Payment], now: DateTime<Utc>) -> ScoreBreakdown {
        let p = &self.policy;

        let payment_history = self.payment_history_score(payments);
        let defaults = self.default_score(loans);
        let utilization = self.utilization_score(loans);
        let history_length = self.history_length_score(loans, now);
        let recent_activity = self.recent_activity_score(loans, payments, now);

        let mut score = dec!(100);
        for (factor, weight) in [
            (payment_history, p.payment_history_weight),
            (defaults, p.default_weight),
            (utilization, p.utilization_weight),
            (history_length, p.history_length_weight),
            (recent_activity, p.recent_activity_weight),
        ] {
            score = score * (Decimal::ONE - weight) + factor * weight;
        }

        let rounded = score
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, dec!(100));

        ScoreBreakdown {
            payment_history,
            defaults,
            utilization,
            history_length,
            recent_activity,
            score: rounded.to_u8().unwrap_or(0),
        }
    }

    fn payment_history_score(&self, payments: &[Payment]) -> Decimal {
        let completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();
        if completed.is_empty() {
            return dec!(100);
        }

        let on_time = completed.iter().filter(|p| p.is_on_time).count();
        let severe = completed
            .iter()
            .filter(|p| !p.is_on_time && p.late_days > self.policy.severe_late_days)
            .count();
        let moderate = completed
            .iter()
            .filter(|p| {
                !p.is_on_time
                    && p.late_days > self.policy.moderate_late_days
                    && p.late_days <= self.policy.severe_late_days
            })
            .count();

        let ratio = Decimal::from(on_time) / Decimal::from(completed.len());
        let score = ratio * dec!(100)
            - Decimal::from(severe) * self.policy.severe_late_penalty
            - Decimal::from(moderate) * self.policy.moderate_late_penalty;
        score.max(Decimal::ZERO)
    }

    fn default_score(&self, loans: &[Loan]) -> Decimal {
        if loans.is_empty() {
            return dec!(100);
        }
        let defaulted = loans.iter().filter(|l| l.status == LoanStatus::Defaulted).count();
        let rate = Decimal::from(defaulted) / Decimal::from(loans.len());
        (dec!(100) - rate * dec!(100)).max(Decimal::ZERO)
    }

    fn utilization_score(&self, loans: &[Loan]) -> Decimal {
        let exposure: Vec<&Loan> = loans
            .iter()
            .filter(|l| matches!(l.status, LoanStatus::Active | LoanStatus::OnTrack | LoanStatus::AtRisk))
            .collect();
        if exposure.is_empty() {
            return dec!(100);
        }

        let total: Decimal = exposure.iter().map(|l| l.total_amount.amount()).sum();
        let limit = self
            .policy
            .utilization_floor_limit
            .max(total * self.policy.utilization_limit_multiplier);
        if limit <= Decimal::ZERO {
            return self.policy.utilization_overflow_score;
        }
        let utilization = total / limit;

        self.policy
            .utilization_bands
            .iter()
            .find(|band| utilization <= band.max_ratio)
            .map(|band| band.score)
            .unwrap_or(self.policy.utilization_overflow_score)
    }

    fn history_length_score(&self, loans: &[Loan], now: DateTime<Utc>) -> Decimal {
        let Some(first) = loans.iter().map(|l| l.created_at).min() else {
            return self.policy.history_base_score;
        };
        // Fractional periods: 167 days at 30 days per period is 5.57 periods
        let period_millis = Duration::days(self.policy.history_period_days.max(1)).num_milliseconds();
        let elapsed_millis = (now - first).num_milliseconds().max(0);
        let periods = Decimal::from(elapsed_millis) / Decimal::from(period_millis);
        (self.policy.history_base_score + periods * self.policy.history_points_per_period).min(dec!(100))
    }

    fn recent_activity_score(&self, loans: &[Loan], payments: &[Payment], now: DateTime<Utc>) -> Decimal {
        let cutoff = now - Duration::days(self.policy.recent_window_days);

        let recent_loans = loans.iter().filter(|l| l.created_at > cutoff).count();
        let recent_payments: Vec<&Payment> = payments.iter().filter(|p| p.payment_date > cutoff).collect();

        if recent_loans == 0 && recent_payments.is_empty() {
            return self.policy.recent_idle_score;
        }
        if recent_payments.is_empty() {
            return dec!(100);
        }

        let on_time = recent_payments
            .iter()
            .filter(|p| p.is_on_time && p.is_completed())
            .count();
        Decimal::from(on_time) / Decimal::from(recent_payments.len()) * dec!(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_scores() {
        let scorer = CreditScorer::default();
        let breakdown = scorer.breakdown(&[], &[], Utc::now());

        assert_eq!(breakdown.payment_history, dec!(100));
        assert_eq!(breakdown.defaults, dec!(100));
        assert_eq!(breakdown.utilization, dec!(100));
        assert_eq!(breakdown.history_length, dec!(50));
        assert_eq!(breakdown.recent_activity, dec!(70));
        // 100 → 100 → 100 → 100 → 95 → 92.5
        assert_eq!(breakdown.score, 93);
    }

    #[test]
    fn test_completion_adjustment() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.completion_adjustment(true), 5);
        assert_eq!(policy.completion_adjustment(false), -2);
    }

    #[test]
    fn test_policy_partial_override() {
        let policy: ScoringPolicy = serde_json::from_str(r#"{"recent_idle_score": "60"}"#).unwrap();
        assert_eq!(policy.recent_idle_score, dec!(60));
        assert_eq!(policy.default_weight, dec!(0.25));
    }
}
