//! Client repayment analytics

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Currency, Money, MoneyError};
use domain_lending::{Loan, LoanStatus, Payment};

/// Overall repayment risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    VeryLow,
}

impl RiskLevel {
    /// Classifies from percentages and average lateness
    pub fn classify(default_rate: Decimal, timely_rate: Decimal, average_days_late: Decimal) -> Self {
        if default_rate > dec!(20) || timely_rate < dec!(60) {
            RiskLevel::High
        } else if default_rate > dec!(10) || timely_rate < dec!(80) || average_days_late > dec!(14) {
            RiskLevel::Medium
        } else if default_rate > dec!(5) || timely_rate < dec!(90) || average_days_late > dec!(7) {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::VeryLow => write!(f, "Very Low"),
        }
    }
}

/// Regularity of the gaps between payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentConsistency {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PaymentConsistency {
    /// Coefficient of variation of the intervals between completed payments
    ///
    /// Fewer than 3 payments is `Excellent`. Payments all made at the same
    /// instant have no meaningful interval and rate `Poor`.
    pub fn assess(payments: &[Payment]) -> Self {
        if payments.len() < 3 {
            return PaymentConsistency::Excellent;
        }

        let mut dates: Vec<DateTime<Utc>> = payments
            .iter()
            .filter(|p| p.is_completed())
            .map(|p| p.payment_date)
            .collect();
        dates.sort();

        let intervals: Vec<f64> = dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 86_400_000.0)
            .collect();
        if intervals.is_empty() {
            return PaymentConsistency::Poor;
        }

        let n = intervals.len() as f64;
        let mean = intervals.iter().sum::<f64>() / n;
        if mean <= 0.0 {
            return PaymentConsistency::Poor;
        }
        let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
        let ratio = variance.sqrt() / mean;

        if ratio < 0.1 {
            PaymentConsistency::Excellent
        } else if ratio < 0.2 {
            PaymentConsistency::Good
        } else if ratio < 0.3 {
            PaymentConsistency::Fair
        } else {
            PaymentConsistency::Poor
        }
    }
}

/// Direction of lateness over the payment history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImprovementTrend {
    Improving,
    Stable,
    Declining,
}

impl ImprovementTrend {
    /// Compares average late days of the older and newer halves of the
    /// completed payments; fewer than 4 payments is `Stable`
    pub fn assess(payments: &[Payment]) -> Self {
        let mut completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();
        if completed.len() < 4 {
            return ImprovementTrend::Stable;
        }
        completed.sort_by_key(|p| p.payment_date);

        let half = completed.len().div_ceil(2);
        let (older, newer) = completed.split_at(half);
        let first = average_late_days(older);
        let second = average_late_days(newer);

        if second < first * dec!(0.7) {
            ImprovementTrend::Improving
        } else if second > first * dec!(1.3) {
            ImprovementTrend::Declining
        } else {
            ImprovementTrend::Stable
        }
    }
}

fn average_late_days(payments: &[&Payment]) -> Decimal {
    if payments.is_empty() {
        return Decimal::ZERO;
    }
    let days: u64 = payments.iter().map(|p| u64::from(p.late_days)).sum();
    Decimal::from(days) / Decimal::from(payments.len())
}

/// Counts and rates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_loans: usize,
    pub active_loans: usize,
    pub completed_loans: usize,
    pub defaulted_loans: usize,
    pub total_payments: usize,
    pub on_time_payments: usize,
    pub late_payments: usize,
    /// Percent, whole number
    pub timely_repayment_rate: Decimal,
    /// Percent, whole number
    pub default_rate: Decimal,
    /// One decimal place
    pub average_days_late: Decimal,
}

/// Money borrowed and repaid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceFinancials {
    pub total_borrowed: Money,
    pub total_repaid: Money,
    /// Share of each repayment attributed to interest at the loan's rate
    pub estimated_interest_paid: Money,
    pub outstanding_balance: Money,
}

/// Repayment behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceTrends {
    pub payment_consistency: PaymentConsistency,
    pub risk_level: RiskLevel,
    pub improvement: ImprovementTrend,
}

/// Full analytics for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPerformance {
    pub summary: PerformanceSummary,
    pub financials: PerformanceFinancials,
    pub trends: PerformanceTrends,
}

impl ClientPerformance {
    /// Analyses a client's loans and payments, all in `currency`
    pub fn analyse(currency: Currency, loans: &[Loan], payments: &[Payment]) -> Result<Self, MoneyError> {
        let active_loans = loans.iter().filter(|l| l.status.is_disbursed()).count();
        let completed_loans = loans.iter().filter(|l| l.status == LoanStatus::Completed).count();
        let defaulted_loans = loans.iter().filter(|l| l.status == LoanStatus::Defaulted).count();

        let completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();
        let on_time_payments = completed.iter().filter(|p| p.is_on_time).count();
        let late_payments = completed.len() - on_time_payments;

        let timely_rate = if payments.is_empty() {
            dec!(100)
        } else {
            Decimal::from(on_time_payments) / Decimal::from(payments.len()) * dec!(100)
        };
        let default_rate = if loans.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(defaulted_loans) / Decimal::from(loans.len()) * dec!(100)
        };
        let average_days_late = {
            let late: Vec<&Payment> = completed.iter().copied().filter(|p| p.late_days > 0).collect();
            average_late_days(&late)
        };

        let total_borrowed = Money::sum(currency, loans.iter().map(|l| &l.total_amount))?;
        let total_repaid = Money::sum(currency, completed.iter().map(|p| &p.amount))?;
        let mut interest = Money::zero(currency);
        for payment in &completed {
            if let Some(loan) = loans.iter().find(|l| l.id == payment.loan_id) {
                interest = interest.checked_add(&loan.interest_rate.apply(&payment.amount))?;
            }
        }

        Ok(Self {
            summary: PerformanceSummary {
                total_loans: loans.len(),
                active_loans,
                completed_loans,
                defaulted_loans,
                total_payments: payments.len(),
                on_time_payments,
                late_payments,
                timely_repayment_rate: timely_rate.round(),
                default_rate: default_rate.round(),
                average_days_late: average_days_late.round_dp(1),
            },
            financials: PerformanceFinancials {
                total_borrowed,
                total_repaid,
                estimated_interest_paid: interest.round_to_currency(),
                outstanding_balance: total_borrowed.checked_sub(&total_repaid)?,
            },
            trends: PerformanceTrends {
                payment_consistency: PaymentConsistency::assess(payments),
                risk_level: RiskLevel::classify(default_rate, timely_rate, average_days_late),
                improvement: ImprovementTrend::assess(payments),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::classify(dec!(25), dec!(100), dec!(0)), RiskLevel::High);
        assert_eq!(RiskLevel::classify(dec!(0), dec!(100), dec!(15)), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(dec!(0), dec!(85), dec!(0)), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(dec!(0), dec!(100), dec!(0)), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::VeryLow.to_string(), "Very Low");
    }

    #[test]
    fn test_short_histories() {
        assert_eq!(PaymentConsistency::assess(&[]), PaymentConsistency::Excellent);
        assert_eq!(ImprovementTrend::assess(&[]), ImprovementTrend::Stable);
    }
}
