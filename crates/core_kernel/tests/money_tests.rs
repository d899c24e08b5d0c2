//! Unit tests for the Money module
//!
//! Tests cover creation, ceiling rounding used by loan charges,
//! checked arithmetic and rates.

use core_kernel::{Money, Currency, MoneyError, Rate};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::KES);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_from_major_and_minor() {
        assert_eq!(Money::from_major(1100, Currency::KES).amount(), dec!(1100));
        assert_eq!(Money::from_minor(10050, Currency::KES).amount(), dec!(100.50));
        assert_eq!(Money::from_minor(10050, Currency::UGX).amount(), dec!(10050));
    }

    #[test]
    fn test_default_currency_is_kes() {
        assert_eq!(Currency::default(), Currency::KES);
    }
}

mod rounding {
    use super::*;

    #[test]
    fn test_ceil_installment_of_1100_over_30() {
        let total = Money::from_major(1100, Currency::KES);
        let installment = total.divide(dec!(30)).unwrap().ceil();
        assert_eq!(installment.amount(), dec!(37));
    }

    #[test]
    fn test_round_to_currency_for_interest() {
        let interest = Money::new(dec!(9.863013), Currency::KES);
        assert_eq!(interest.round_to_currency().amount(), dec!(9.86));
    }

    #[test]
    fn test_ceil_on_negative_moves_toward_zero() {
        let m = Money::new(dec!(-2.5), Currency::KES);
        assert_eq!(m.ceil().amount(), dec!(-2));
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_operators_on_same_currency() {
        let a = Money::from_major(100, Currency::KES);
        let b = Money::from_major(40, Currency::KES);

        assert_eq!((a + b).amount(), dec!(140));
        assert_eq!((a - b).amount(), dec!(60));
        assert_eq!((-a).amount(), dec!(-100));
    }

    #[test]
    fn test_checked_sub_rejects_currency_mismatch() {
        let a = Money::from_major(100, Currency::KES);
        let b = Money::from_major(40, Currency::USD);

        assert_eq!(
            a.checked_sub(&b),
            Err(MoneyError::CurrencyMismatch("KES".to_string(), "USD".to_string()))
        );
    }

    #[test]
    fn test_divide_by_zero() {
        let a = Money::from_major(100, Currency::KES);
        assert_eq!(a.divide(dec!(0)), Err(MoneyError::DivisionByZero));
    }

    #[test]
    fn test_ordering_within_currency() {
        let small = Money::from_major(10, Currency::KES);
        let large = Money::from_major(11, Currency::KES);
        assert!(small < large);
    }
}

mod rates {
    use super::*;

    #[test]
    fn test_percentage_round_trip() {
        let rate = Rate::from_percentage(dec!(12));
        assert_eq!(rate.as_decimal(), dec!(0.12));
        assert_eq!(rate.as_percentage(), dec!(12));
    }

    #[test]
    fn test_zero_rate() {
        assert!(Rate::zero().is_zero());
        assert!(Rate::zero().apply(&Money::from_major(500, Currency::KES)).is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(Rate::from_percentage(dec!(2.5)).to_string(), "2.5%");
    }
}

mod display {
    use super::*;

    #[test]
    fn test_money_display_uses_symbol_and_minor_places() {
        let m = Money::new(dec!(1234.5), Currency::KES);
        assert_eq!(m.to_string(), "KSh 1234.50");
    }
}
