//! Currency-tagged decimal amounts and percentage rates
//!
//! Lending amounts are quoted in whole currency units and every computed
//! charge (interest, deposit, installment, penalty) is rounded *up* so the
//! lender never under-collects.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use thiserror::Error;

/// Currencies the lender books in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    KES,
    UGX,
    TZS,
    USD,
    EUR,
}

impl Currency {
    /// Minor-unit digits; the Ugandan shilling has none
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::UGX => 0,
            _ => 2,
        }
    }

    /// Prefix used when printing amounts
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::KES => "KSh",
            Currency::UGX => "USh",
            Currency::TZS => "TSh",
            Currency::USD => "$",
            Currency::EUR => "€",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::KES => "KES",
            Currency::UGX => "UGX",
            Currency::TZS => "TZS",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "KES" => Ok(Currency::KES),
            "UGX" => Ok(Currency::UGX),
            "TZS" => Ok(Currency::TZS),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Cannot mix {0} and {1} amounts")]
    CurrencyMismatch(String, String),

    #[error("Amount not allowed: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Cannot divide an amount by zero")]
    DivisionByZero,
}

/// An amount in one currency
///
/// Amounts are stored with 4 decimal places internally; rounding to the
/// currency's minor unit or up to a whole unit happens explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates Money from a whole number of major units (e.g. shillings)
    pub fn from_major(units: i64, currency: Currency) -> Self {
        Self::new(Decimal::from(units), currency)
    }

    /// `from_minor(3750, KES)` is 37.50 shillings
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        let divisor = Decimal::new(10_i64.pow(currency.decimal_places()), 0);
        Self::new(Decimal::new(minor_units, 0) / divisor, currency)
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: dec!(0),
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly below zero
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self {
            amount: self.amount.abs(),
            currency: self.currency,
        }
    }

    /// Rounds up to the next whole currency unit
    ///
    /// Used for every charge the lender computes. `36.67` becomes `37`,
    /// `20.00` stays `20`.
    pub fn ceil(&self) -> Self {
        Self {
            amount: self.amount.ceil(),
            currency: self.currency,
        }
    }

    /// Rounds to the currency's standard decimal places (half away from zero)
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                self.currency.decimal_places(),
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency: self.currency,
        }
    }

    /// Floors the value at zero
    pub fn clamp_non_negative(&self) -> Self {
        if self.is_negative() {
            Self::zero(self.currency)
        } else {
            *self
        }
    }

    /// Returns an error unless both values share a currency
    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency))
    }

    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency))
    }

    /// Scales the amount; the result keeps four decimal places
    pub fn multiply(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency)
    }

    /// Divides by a scalar
    pub fn divide(&self, divisor: Decimal) -> Result<Self, MoneyError> {
        if divisor.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        Ok(Self::new(self.amount / divisor, self.currency))
    }

    /// Sums an iterator of amounts, failing on the first currency mismatch
    pub fn sum<'a, I>(currency: Currency, items: I) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{} {:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

// Operators are only used after the aggregate has checked the currency of
// incoming amounts; a mismatch here is a programming error.
impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        debug_assert_eq!(self.currency, other.currency, "currency mismatch in Money::add");
        Self::new(self.amount + other.amount, self.currency)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        debug_assert_eq!(self.currency, other.currency, "currency mismatch in Money::sub");
        Self::new(self.amount - other.amount, self.currency)
    }
}

/// Amounts in different currencies are unordered, so every comparison
/// operator returns `false` for them
impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        self.amount.partial_cmp(&other.amount)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.amount, self.currency)
    }
}

/// Represents a percentage rate (interest rate, deposit share, penalty rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize, Default)]
pub struct Rate {
    /// The rate as a decimal (e.g., 0.05 for 5%)
    value: Decimal,
}

impl Rate {
    /// Creates a rate from a decimal value (e.g., 0.05 for 5%)
    pub fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Creates a rate from a percentage (e.g., 5.0 for 5%)
    pub fn from_percentage(percentage: Decimal) -> Self {
        Self {
            value: percentage / dec!(100),
        }
    }

    pub fn zero() -> Self {
        Self { value: Decimal::ZERO }
    }

    /// Returns the rate as a decimal
    pub fn as_decimal(&self) -> Decimal {
        self.value
    }

    /// Returns the rate as a percentage
    pub fn as_percentage(&self) -> Decimal {
        self.value * dec!(100)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Applies this rate to a money amount
    pub fn apply(&self, money: &Money) -> Money {
        money.multiply(self.value)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let m = Money::new(dec!(100.50), Currency::KES);
        assert_eq!(m.amount(), dec!(100.50));
        assert_eq!(m.currency(), Currency::KES);
    }

    #[test]
    fn test_ceil_rounds_up_to_whole_units() {
        let m = Money::new(dec!(36.6667), Currency::KES);
        assert_eq!(m.ceil().amount(), dec!(37));

        let exact = Money::from_major(20, Currency::KES);
        assert_eq!(exact.ceil().amount(), dec!(20));
    }

    #[test]
    fn test_currency_mismatch() {
        let kes = Money::from_major(100, Currency::KES);
        let usd = Money::from_major(100, Currency::USD);

        let result = kes.checked_add(&usd);
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_ordering_within_one_currency() {
        let small = Money::from_major(500, Currency::KES);
        let large = Money::new(dec!(500.01), Currency::KES);

        assert!(small < large);
        assert!(large >= small);
        assert_eq!(small.partial_cmp(&Money::new(dec!(500.00), Currency::KES)), Some(Ordering::Equal));
    }

    #[test]
    fn test_different_currencies_are_unordered() {
        let kes = Money::from_major(100, Currency::KES);
        let usd = Money::from_major(1, Currency::USD);

        assert_eq!(kes.partial_cmp(&usd), None);
        assert!(!(kes > usd));
        assert!(!(kes < usd));
        assert!(!(kes >= usd));
    }

    #[test]
    fn test_clamp_non_negative() {
        let m = Money::from_major(-5, Currency::KES);
        assert!(m.clamp_non_negative().is_zero());
        assert_eq!(Money::from_major(5, Currency::KES).clamp_non_negative().amount(), dec!(5));
    }

    #[test]
    fn test_sum() {
        let items = vec![
            Money::from_major(10, Currency::KES),
            Money::from_major(15, Currency::KES),
        ];
        let total = Money::sum(Currency::KES, &items).unwrap();
        assert_eq!(total.amount(), dec!(25));
    }

    #[test]
    fn test_rate_application() {
        let rate = Rate::from_percentage(dec!(10));
        let amount = Money::from_major(1000, Currency::KES);

        assert_eq!(rate.apply(&amount).amount(), dec!(100));
        assert_eq!(rate.to_string(), "10%");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("kes".parse::<Currency>().unwrap(), Currency::KES);
        assert!("XYZ".parse::<Currency>().is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ceil_never_under_collects(minor in 0i64..1_000_000_000i64) {
            let money = Money::from_minor(minor, Currency::KES);
            let rounded = money.ceil();

            prop_assert!(rounded.amount() >= money.amount());
            prop_assert!(rounded.amount() - money.amount() < dec!(1));
        }

        #[test]
        fn checked_add_then_sub_is_identity(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64
        ) {
            let ma = Money::from_minor(a, Currency::KES);
            let mb = Money::from_minor(b, Currency::KES);

            let back = ma.checked_add(&mb).unwrap().checked_sub(&mb).unwrap();
            prop_assert_eq!(back, ma);
        }
    }
}
