//! Interest Plan Calculator
//!
//! Pure pricing of a loan from its plan, principal and term:
//!
//! ```text
//! interest            = P * r / 100
//! total               = P + interest
//! deposit             = P * dep / 100
//! amount_after_deposit = total - deposit
//! installment         = amount_after_deposit / installment_count
//! ```
//!
//! Every monetary output is rounded up to a whole currency unit so the
//! schedule never under-collects.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{DurationUnit, Money, Rate};
use crate::error::LendingError;
use crate::plan::{duration_in_days, InterestPlan, PaymentFrequency};

/// Priced terms for a prospective loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub interest: Money,
    pub total: Money,
    pub deposit: Money,
    pub amount_after_deposit: Money,
    pub installment: Money,
    pub installment_count: u32,
    pub duration: u32,
    pub duration_unit: DurationUnit,
}

/// Prices a loan without any plan policy checks
///
/// # Arguments
///
/// * `principal` - Amount financed
/// * `interest_rate` - Flat rate over the whole term
/// * `duration` - Term length in `duration_unit`
/// * `frequency` - Installment cadence
/// * `deposit_percentage` - Share of the principal collected upfront, 0..=100
///
/// # Errors
///
/// Returns `Validation` for a non-positive principal, zero duration or a
/// deposit percentage outside 0..=100.
pub fn compute_terms(
    principal: Money,
    interest_rate: Rate,
    duration: u32,
    duration_unit: DurationUnit,
    frequency: PaymentFrequency,
    deposit_percentage: Decimal,
) -> Result<LoanTerms, LendingError> {
    if !principal.is_positive() {
        return Err(LendingError::validation("Loan amount must be greater than 0"));
    }
    if duration == 0 {
        return Err(LendingError::validation("Duration must be at least 1"));
    }
    if deposit_percentage < Decimal::ZERO || deposit_percentage > dec!(100) {
        return Err(LendingError::validation(
            "Deposit percentage must be between 0 and 100",
        ));
    }

    let interest = interest_rate.apply(&principal);
    let total = principal.checked_add(&interest)?;
    let deposit = Rate::from_percentage(deposit_percentage).apply(&principal);
    let amount_after_deposit = total.checked_sub(&deposit)?;

    let installment_count = frequency.installment_count(duration_in_days(duration, duration_unit));
    let installment = amount_after_deposit.divide(Decimal::from(installment_count))?;

    Ok(LoanTerms {
        principal,
        interest: interest.ceil(),
        total: total.ceil(),
        deposit: deposit.ceil(),
        amount_after_deposit: amount_after_deposit.ceil(),
        installment: installment.ceil(),
        installment_count,
        duration,
        duration_unit,
    })
}

/// Prices a loan under a plan, enforcing the plan's policy first
///
/// # Errors
///
/// - `Validation` if the plan is inactive
/// - `Validation` if the principal or duration is outside the plan's bounds
pub fn calculate_terms(
    plan: &InterestPlan,
    principal: Money,
    duration: u32,
    deposit_percentage: Decimal,
) -> Result<LoanTerms, LendingError> {
    plan.ensure_active()?;
    plan.validate_principal(&principal)?;
    plan.validate_duration(duration)?;

    compute_terms(
        principal,
        plan.interest_rate,
        duration,
        plan.duration_unit,
        plan.payment_frequency,
        deposit_percentage,
    )
}

/// Final due date of a loan starting at `start`
pub fn due_date(
    start: DateTime<Utc>,
    duration: u32,
    unit: DurationUnit,
) -> Result<DateTime<Utc>, LendingError> {
    Ok(unit.add_to(start, duration)?)
}
