//! Financed items
//!
//! Only the numeric fields of an item matter to lending: its price becomes the
//! principal, its deposit percentage prices the upfront payment, and its
//! stock is consumed when an item loan is disbursed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ItemId, Money};
use crate::error::LendingError;

/// A stocked item available for asset financing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Selling price, used as the loan principal
    pub actual_price: Money,
    /// Upfront share of the price, 0..=100
    pub deposit_percentage: Decimal,
    pub stock: u32,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>, actual_price: Money, deposit_percentage: Decimal, stock: u32) -> Self {
        Self {
            id: ItemId::new_v7(),
            name: name.into(),
            actual_price,
            deposit_percentage,
            stock,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// Fails unless the item can back a new loan
    pub fn ensure_available(&self) -> Result<(), LendingError> {
        if !self.is_active {
            return Err(LendingError::ItemUnavailable(format!(
                "{} is not active",
                self.name
            )));
        }
        if self.stock == 0 {
            return Err(LendingError::ItemUnavailable(format!(
                "{} is out of stock",
                self.name
            )));
        }
        Ok(())
    }

    /// Removes one unit from stock
    pub fn take_one(&mut self, now: DateTime<Utc>) -> Result<(), LendingError> {
        self.ensure_available()?;
        self.stock -= 1;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_take_one_until_empty() {
        let mut item = Item::new("Solar lamp", Money::from_major(4_500, Currency::KES), dec!(20), 1);
        let now = Utc::now();

        assert!(item.take_one(now).is_ok());
        assert_eq!(item.stock, 0);
        assert!(matches!(item.take_one(now), Err(LendingError::ItemUnavailable(_))));
    }

    #[test]
    fn test_inactive_item_unavailable() {
        let mut item = Item::new("Phone", Money::from_major(12_000, Currency::KES), dec!(30), 5);
        item.is_active = false;
        assert!(item.ensure_available().is_err());
    }
}
