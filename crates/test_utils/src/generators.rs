//! Property-Based Test Generators
//!
//! Proptest strategies for amounts, rates and terms that stay inside the
//! ranges the lending rules accept.

use core_kernel::{Currency, Money};
use domain_lending::PaymentFrequency;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Whole-shilling principal between 100 and 500,000
pub fn principal_strategy() -> impl Strategy<Value = Money> {
    (100i64..=500_000).prop_map(|units| Money::from_major(units, Currency::KES))
}

/// Positive KES amount with cents, up to 100,000
pub fn kes_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..=10_000_000).prop_map(|cents| Money::from_minor(cents, Currency::KES))
}

/// Interest percentage between 0 and 50 with two decimal places
pub fn interest_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000).prop_map(|basis| Decimal::new(basis, 2))
}

/// Whole deposit percentage between 0 and 50
pub fn deposit_percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=50).prop_map(Decimal::from)
}

/// Loan duration in days
pub fn duration_days_strategy() -> impl Strategy<Value = u32> {
    1u32..=365
}

pub fn payment_frequency_strategy() -> impl Strategy<Value = PaymentFrequency> {
    prop_oneof![
        Just(PaymentFrequency::Daily),
        Just(PaymentFrequency::Weekly),
        Just(PaymentFrequency::Monthly),
        Just(PaymentFrequency::OneTime),
    ]
}

/// Split points for paying a balance in several installments
///
/// Each value is a share in percent of the balance still owed; the last
/// payment of a sequence settles whatever is left.
pub fn repayment_shares_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=100, 1..8)
}
