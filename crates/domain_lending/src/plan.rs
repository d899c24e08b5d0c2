//! Interest plans
//!
//! A plan carries the numeric policy a loan is priced with. Loans copy the
//! rates and frequency at origination, so editing a plan never reprices an
//! existing loan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Currency, DurationUnit, InterestPlanId, Money, Rate};
use crate::error::LendingError;

/// What a plan finances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemType {
    /// Cash loan
    Money,
    /// Asset financing against a stocked item
    Item,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Money => write!(f, "money"),
            ItemType::Item => write!(f, "item"),
        }
    }
}

/// How often installments fall due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentFrequency {
    Daily,
    Weekly,
    Monthly,
    OneTime,
}

impl PaymentFrequency {
    /// Number of installments for a term of `days` calendar days
    ///
    /// daily → days, weekly → ceil(days/7), monthly → ceil(days/30),
    /// one-time → 1. Never returns zero.
    pub fn installment_count(&self, days: u32) -> u32 {
        let count = match self {
            PaymentFrequency::Daily => days,
            PaymentFrequency::Weekly => days.div_ceil(7),
            PaymentFrequency::Monthly => days.div_ceil(30),
            PaymentFrequency::OneTime => 1,
        };
        count.max(1)
    }
}

impl fmt::Display for PaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentFrequency::Daily => "daily",
            PaymentFrequency::Weekly => "weekly",
            PaymentFrequency::Monthly => "monthly",
            PaymentFrequency::OneTime => "one-time",
        };
        write!(f, "{}", label)
    }
}

/// Converts a duration expressed in `unit` into calendar days for
/// installment counting (weeks = 7 days, months = 30 days).
pub fn duration_in_days(duration: u32, unit: DurationUnit) -> u32 {
    match unit {
        DurationUnit::Days => duration,
        DurationUnit::Weeks => duration.saturating_mul(7),
        DurationUnit::Months => duration.saturating_mul(30),
    }
}

/// An interest plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPlan {
    pub id: InterestPlanId,
    pub name: String,
    pub item_type: ItemType,
    pub payment_frequency: PaymentFrequency,
    /// Flat interest over the whole term
    pub interest_rate: Rate,
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub duration_unit: DurationUnit,
    /// Charged per day late on the installment amount
    pub penalty_rate: Rate,
    pub currency: Currency,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl InterestPlan {
    /// Creates an active plan with no amount or duration limits
    ///
    /// # Arguments
    ///
    /// * `name` - Display name
    /// * `item_type` - Money or item financing
    /// * `payment_frequency` - Installment cadence
    /// * `interest_percentage` - Flat interest, e.g. `10` for 10%
    pub fn new(
        name: impl Into<String>,
        item_type: ItemType,
        payment_frequency: PaymentFrequency,
        interest_percentage: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            id: InterestPlanId::new_v7(),
            name: name.into(),
            item_type,
            payment_frequency,
            interest_rate: Rate::from_percentage(interest_percentage),
            min_amount: None,
            max_amount: None,
            min_duration: None,
            max_duration: None,
            duration_unit: DurationUnit::Days,
            penalty_rate: Rate::zero(),
            currency,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_amount_range(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn with_duration_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_duration = min;
        self.max_duration = max;
        self
    }

    pub fn with_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Sets the per-day penalty, e.g. `2` for 2% of the installment per day late
    pub fn with_penalty_percentage(mut self, percentage: Decimal) -> Self {
        self.penalty_rate = Rate::from_percentage(percentage);
        self
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Rejects use of an inactive plan
    pub fn ensure_active(&self) -> Result<(), LendingError> {
        if !self.is_active {
            return Err(LendingError::validation(format!(
                "Interest plan '{}' is not active",
                self.name
            )));
        }
        Ok(())
    }

    /// Checks the principal against the plan's optional bounds
    pub fn validate_principal(&self, principal: &Money) -> Result<(), LendingError> {
        if principal.currency() != self.currency {
            return Err(LendingError::validation(format!(
                "Principal currency {} does not match plan currency {}",
                principal.currency(),
                self.currency
            )));
        }
        if !principal.is_positive() {
            return Err(LendingError::validation("Loan amount must be greater than 0"));
        }
        if let Some(min) = self.min_amount {
            if *principal < min {
                return Err(LendingError::validation(format!(
                    "Loan amount {} is below the plan minimum of {}",
                    principal, min
                )));
            }
        }
        if let Some(max) = self.max_amount {
            if *principal > max {
                return Err(LendingError::validation(format!(
                    "Loan amount {} exceeds the plan maximum of {}",
                    principal, max
                )));
            }
        }
        Ok(())
    }

    /// Checks the duration against the plan's optional bounds
    pub fn validate_duration(&self, duration: u32) -> Result<(), LendingError> {
        if duration == 0 {
            return Err(LendingError::validation("Duration must be at least 1"));
        }
        if let Some(min) = self.min_duration {
            if duration < min {
                return Err(LendingError::validation(format!(
                    "Duration must be at least {} {}",
                    min, self.duration_unit
                )));
            }
        }
        if let Some(max) = self.max_duration {
            if duration > max {
                return Err(LendingError::validation(format!(
                    "Duration cannot exceed {} {}",
                    max, self.duration_unit
                )));
            }
        }
        Ok(())
    }
}
