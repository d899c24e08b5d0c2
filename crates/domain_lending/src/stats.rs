//! Read-only aggregates over loans and payments

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{Currency, Money, MoneyError, UserId};
use crate::loan::{Loan, LoanStatus};
use crate::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::plan::ItemType;

/// Portfolio totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanStats {
    pub total_loans: usize,
    pub by_status: BTreeMap<LoanStatus, usize>,
    pub by_type: BTreeMap<ItemType, usize>,
    pub total_principal: Money,
    pub total_amount_paid: Money,
    pub total_outstanding: Money,
    pub average_loan: Money,
}

impl LoanStats {
    /// Summarises `loans`; all loans must be in `currency`
    pub fn from_loans(currency: Currency, loans: &[Loan]) -> Result<Self, MoneyError> {
        let mut by_status = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        for loan in loans {
            *by_status.entry(loan.status).or_insert(0) += 1;
            *by_type.entry(loan.loan_type).or_insert(0) += 1;
        }

        let total_principal = Money::sum(currency, loans.iter().map(|l| &l.principal))?;
        let total_amount_paid = Money::sum(currency, loans.iter().map(|l| &l.amount_paid))?;
        // rejected loans never carried a debt
        let total_outstanding = Money::sum(
            currency,
            loans
                .iter()
                .filter(|l| l.status != LoanStatus::Rejected)
                .map(|l| &l.remaining_balance),
        )?;
        let average_loan = if loans.is_empty() {
            Money::zero(currency)
        } else {
            total_principal
                .divide(Decimal::from(loans.len()))?
                .round_to_currency()
        };

        Ok(Self {
            total_loans: loans.len(),
            by_status,
            by_type,
            total_principal,
            total_amount_paid,
            total_outstanding,
            average_loan,
        })
    }

    pub fn count(&self, status: LoanStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Count and sum of a payment grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBucket {
    pub count: usize,
    pub amount: Money,
}

impl PaymentBucket {
    fn empty(currency: Currency) -> Self {
        Self {
            count: 0,
            amount: Money::zero(currency),
        }
    }

    fn add(&mut self, amount: Money) {
        self.count += 1;
        self.amount = self.amount + amount;
    }
}

/// Collections totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
    pub total_payments: usize,
    pub total_amount: Money,
    pub total_penalties: Money,
    pub average_payment: Money,
    pub by_method: BTreeMap<PaymentMethod, PaymentBucket>,
    pub by_status: BTreeMap<PaymentStatus, PaymentBucket>,
    pub late_payments: usize,
    pub average_late_days: Decimal,
    pub by_collector: BTreeMap<UserId, PaymentBucket>,
}

impl PaymentStats {
    /// Summarises `payments`
    ///
    /// Totals, averages and lateness only count completed payments; the
    /// status breakdown covers every record.
    pub fn from_payments(currency: Currency, payments: &[Payment]) -> Result<Self, MoneyError> {
        let mut by_method = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        let mut by_collector = BTreeMap::new();

        for payment in payments {
            by_status
                .entry(payment.status)
                .or_insert_with(|| PaymentBucket::empty(currency))
                .add(payment.amount);
        }

        let completed: Vec<&Payment> = payments.iter().filter(|p| p.is_completed()).collect();
        for payment in &completed {
            by_method
                .entry(payment.method)
                .or_insert_with(|| PaymentBucket::empty(currency))
                .add(payment.amount);
            by_collector
                .entry(payment.received_by)
                .or_insert_with(|| PaymentBucket::empty(currency))
                .add(payment.amount);
        }

        let total_amount = Money::sum(currency, completed.iter().map(|p| &p.amount))?;
        let total_penalties = Money::sum(currency, completed.iter().map(|p| &p.penalty_amount))?;
        let average_payment = if completed.is_empty() {
            Money::zero(currency)
        } else {
            total_amount
                .divide(Decimal::from(completed.len()))?
                .round_to_currency()
        };

        let late: Vec<&&Payment> = completed.iter().filter(|p| p.late_days > 0).collect();
        let average_late_days = if late.is_empty() {
            Decimal::ZERO
        } else {
            let days: u64 = late.iter().map(|p| u64::from(p.late_days)).sum();
            (Decimal::from(days) / Decimal::from(late.len())).round_dp(1)
        };

        Ok(Self {
            total_payments: completed.len(),
            total_amount,
            total_penalties,
            average_payment,
            by_method,
            by_status,
            late_payments: late.len(),
            average_late_days,
            by_collector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use core_kernel::{ClientId, LoanId, Rate};
    use rust_decimal_macros::dec;
    use crate::payment::{assess_lateness, document_number, Lateness};

    fn kes(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    fn payment(amount: i64, method: PaymentMethod, late_days: i64, collector: UserId) -> Payment {
        let due = Utc::now();
        let paid = due + Duration::days(late_days);
        let lateness = if late_days > 0 {
            assess_lateness(paid, due, &kes(100), Rate::from_percentage(dec!(1)))
        } else {
            Lateness::on_time(&kes(100))
        };
        Payment::completed(
            document_number("PMT", 2024, 1),
            LoanId::new(),
            ClientId::new(),
            kes(amount),
            method,
            Some("REF".to_string()),
            paid,
            due,
            lateness,
            collector,
        )
    }

    #[test]
    fn test_payment_stats_breakdowns() {
        let teller = UserId::new();
        let agent = UserId::new();
        let mut reversed = payment(50, PaymentMethod::Cash, 0, teller);
        reversed.reverse("Typo", teller, Utc::now()).unwrap();

        let payments = vec![
            payment(100, PaymentMethod::Cash, 0, teller),
            payment(300, PaymentMethod::Mpesa, 4, agent),
            payment(200, PaymentMethod::Mpesa, 2, agent),
            reversed,
        ];

        let stats = PaymentStats::from_payments(Currency::KES, &payments).unwrap();

        assert_eq!(stats.total_payments, 3);
        assert_eq!(stats.total_amount, kes(600));
        assert_eq!(stats.average_payment, kes(200));
        assert_eq!(stats.late_payments, 2);
        assert_eq!(stats.average_late_days, dec!(3));
        assert_eq!(stats.total_penalties, kes(6));
        assert_eq!(stats.by_method[&PaymentMethod::Mpesa].count, 2);
        assert_eq!(stats.by_status[&PaymentStatus::Reversed].amount, kes(50));
        assert_eq!(stats.by_collector[&agent].amount, kes(500));
    }

    #[test]
    fn test_empty_stats() {
        let stats = PaymentStats::from_payments(Currency::KES, &[]).unwrap();
        assert_eq!(stats.total_payments, 0);
        assert!(stats.average_payment.is_zero());

        let loans = LoanStats::from_loans(Currency::KES, &[]).unwrap();
        assert_eq!(loans.total_loans, 0);
        assert_eq!(loans.count(LoanStatus::Active), 0);
    }
}
