//! Test Fixtures
//!
//! Pre-built plans, items, amounts and dates shared by the test suites.
//! Every fixture is denominated in KES unless its name says otherwise.

use chrono::{DateTime, Duration, TimeZone, Utc};
use core_kernel::{Currency, Money, UserId};
use domain_lending::{InterestPlan, Item, ItemType, PaymentFrequency};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Staff member recorded on fixtures that need an actor
pub static STAFF_USER: Lazy<UserId> = Lazy::new(UserId::new);

/// Fixture for monetary values
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn kes(amount: Decimal) -> Money {
        Money::new(amount, Currency::KES)
    }

    pub fn kes_major(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    pub fn kes_zero() -> Money {
        Money::zero(Currency::KES)
    }

    /// Money for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }

    /// Opening capital large enough for any single fixture loan
    pub fn opening_capital() -> Money {
        Money::from_major(1_000_000, Currency::KES)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Business day used as "now" by most tests (Mon, Jan 6, 2025 09:00 UTC)
    pub fn business_day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
    }

    pub fn days_after(start: DateTime<Utc>, days: i64) -> DateTime<Utc> {
        start + Duration::days(days)
    }

    pub fn days_before(start: DateTime<Utc>, days: i64) -> DateTime<Utc> {
        start - Duration::days(days)
    }
}

/// Fixture for interest plans
pub struct PlanFixtures;

impl PlanFixtures {
    /// 10% flat interest, paid daily, no limits
    pub fn daily_ten_percent() -> InterestPlan {
        InterestPlan::new(
            "Daily 10%",
            ItemType::Money,
            PaymentFrequency::Daily,
            dec!(10),
            Currency::KES,
        )
    }

    /// Interest-free daily plan charging 2% of the installment per day late
    pub fn daily_interest_free_with_penalty() -> InterestPlan {
        InterestPlan::new(
            "Daily interest-free",
            ItemType::Money,
            PaymentFrequency::Daily,
            Decimal::ZERO,
            Currency::KES,
        )
        .with_penalty_percentage(dec!(2))
    }

    /// Weekly plan bounded to 500..=50,000 and 7..=90 days
    pub fn weekly_bounded() -> InterestPlan {
        InterestPlan::new(
            "Weekly 15%",
            ItemType::Money,
            PaymentFrequency::Weekly,
            dec!(15),
            Currency::KES,
        )
        .with_amount_range(
            Some(Money::from_major(500, Currency::KES)),
            Some(Money::from_major(50_000, Currency::KES)),
        )
        .with_duration_range(Some(7), Some(90))
    }

    /// Monthly asset-financing plan
    pub fn monthly_item() -> InterestPlan {
        InterestPlan::new(
            "Asset 20%",
            ItemType::Item,
            PaymentFrequency::Monthly,
            dec!(20),
            Currency::KES,
        )
    }
}

/// Fixture for financed items
pub struct ItemFixtures;

impl ItemFixtures {
    /// A 12,000 KES phone with a 20% deposit and three units in stock
    pub fn smartphone() -> Item {
        Item::new("Smartphone", Money::from_major(12_000, Currency::KES), dec!(20), 3)
    }

    pub fn out_of_stock() -> Item {
        Item::new("Solar lamp", Money::from_major(3_500, Currency::KES), dec!(10), 0)
    }
}
