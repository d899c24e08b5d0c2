//! Repayment records and lateness assessment
//!
//! A `Payment` is created once a repayment has been accepted by the loan and
//! is never deleted: reversal flips its status and keeps the record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{whole_days_between, ClientId, LoanId, Money, PaymentId, Rate, UserId};
use crate::error::LendingError;

/// How a repayment was received
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Bank,
    /// Debited from the client's savings account
    Savings,
}

impl PaymentMethod {
    /// Mobile money and bank transfers must carry an external reference
    pub fn requires_reference(&self) -> bool {
        matches!(self, PaymentMethod::Mpesa | PaymentMethod::Bank)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Savings => "savings",
        };
        write!(f, "{}", label)
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Completed,
    Reversed,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Reversed => "reversed",
            PaymentStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Lateness of a repayment relative to the installment due date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lateness {
    pub late_days: u32,
    pub is_on_time: bool,
    /// Informational; never added to the loan balance
    pub penalty_amount: Money,
}

impl Lateness {
    /// An on-time assessment with no penalty
    pub fn on_time(installment: &Money) -> Self {
        Self {
            late_days: 0,
            is_on_time: true,
            penalty_amount: Money::zero(installment.currency()),
        }
    }
}

/// Computes late days and the penalty for a repayment
///
/// `late_days = max(0, floor((payment_date - due_date) / 1 day))` and
/// `penalty = ceil(installment * penalty_rate * late_days)`.
pub fn assess_lateness(
    payment_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    installment: &Money,
    penalty_rate: Rate,
) -> Lateness {
    let days = whole_days_between(due_date, payment_date).max(0);
    let late_days = u32::try_from(days).unwrap_or(u32::MAX);

    let penalty_amount = if late_days > 0 && !penalty_rate.is_zero() {
        penalty_rate
            .apply(installment)
            .multiply(Decimal::from(late_days))
            .ceil()
    } else {
        Money::zero(installment.currency())
    };

    Lateness {
        late_days,
        is_on_time: late_days == 0,
        penalty_amount,
    }
}

/// A repayment against a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Human-readable number, `PMT-YYYY-NNNNNN`
    pub payment_number: String,
    pub loan_id: LoanId,
    pub client_id: ClientId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// External reference; unique across all payments
    pub transaction_id: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub is_on_time: bool,
    pub late_days: u32,
    pub penalty_amount: Money,
    pub status: PaymentStatus,
    pub received_by: UserId,
    pub notes: Option<String>,
    pub reversal_reason: Option<String>,
    pub reversed_by: Option<UserId>,
    pub reversed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a completed payment record
    #[allow(clippy::too_many_arguments)]
    pub fn completed(
        payment_number: String,
        loan_id: LoanId,
        client_id: ClientId,
        amount: Money,
        method: PaymentMethod,
        transaction_id: Option<String>,
        payment_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        lateness: Lateness,
        received_by: UserId,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            payment_number,
            loan_id,
            client_id,
            amount,
            method,
            // cash payments never keep a reference
            transaction_id: if method == PaymentMethod::Cash { None } else { transaction_id },
            payment_date,
            due_date,
            is_on_time: lateness.is_on_time,
            late_days: lateness.late_days,
            penalty_amount: lateness.penalty_amount,
            status: PaymentStatus::Completed,
            received_by,
            notes: None,
            reversal_reason: None,
            reversed_by: None,
            reversed_at: None,
            created_at: payment_date,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks that the payment can still be reversed
    pub fn ensure_reversible(&self) -> Result<(), LendingError> {
        if self.status != PaymentStatus::Completed {
            return Err(LendingError::PaymentNotReversible {
                payment_number: self.payment_number.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Marks the payment reversed
    ///
    /// # Errors
    ///
    /// - `Validation` if the reason is blank
    /// - `PaymentNotReversible` if the payment is already reversed or failed
    pub fn reverse(
        &mut self,
        reason: &str,
        reversed_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), LendingError> {
        if reason.trim().is_empty() {
            return Err(LendingError::validation("Reversal reason is required"));
        }
        self.ensure_reversible()?;

        self.status = PaymentStatus::Reversed;
        self.reversal_reason = Some(reason.trim().to_string());
        self.reversed_by = Some(reversed_by);
        self.reversed_at = Some(now);
        Ok(())
    }

    /// Marks the payment failed
    pub fn fail(&mut self, reason: &str) {
        self.status = PaymentStatus::Failed;
        self.notes = Some(reason.to_string());
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

/// Formats a document number such as `PMT-2024-000042`
pub fn document_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{}-{}-{:06}", prefix, year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ten_days_late_with_two_percent_penalty() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let paid = due + Duration::days(10) + Duration::hours(3);
        let installment = Money::from_major(100, Currency::KES);

        let lateness = assess_lateness(paid, due, &installment, Rate::from_percentage(dec!(2)));

        assert_eq!(lateness.late_days, 10);
        assert!(!lateness.is_on_time);
        assert_eq!(lateness.penalty_amount, Money::from_major(20, Currency::KES));
    }

    #[test]
    fn test_early_payment_is_on_time() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let installment = Money::from_major(100, Currency::KES);

        let lateness = assess_lateness(due - Duration::days(2), due, &installment, Rate::from_percentage(dec!(2)));

        assert_eq!(lateness.late_days, 0);
        assert!(lateness.is_on_time);
        assert!(lateness.penalty_amount.is_zero());
    }

    #[test]
    fn test_late_without_penalty_rate() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let installment = Money::from_major(37, Currency::KES);

        let lateness = assess_lateness(due + Duration::days(4), due, &installment, Rate::zero());

        assert_eq!(lateness.late_days, 4);
        assert!(lateness.penalty_amount.is_zero());
    }

    #[test]
    fn test_penalty_rounds_up() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let installment = Money::from_major(37, Currency::KES);

        let lateness = assess_lateness(due + Duration::days(1), due, &installment, Rate::from_percentage(dec!(1)));

        assert_eq!(lateness.penalty_amount, Money::from_major(1, Currency::KES));
    }

    #[test]
    fn test_document_number_format() {
        assert_eq!(document_number("PMT", 2024, 1), "PMT-2024-000001");
        assert_eq!(document_number("LN", 2025, 123_456), "LN-2025-123456");
    }

    #[test]
    fn test_reverse_only_once() {
        let now = Utc::now();
        let mut payment = Payment::completed(
            document_number("PMT", 2024, 1),
            LoanId::new(),
            ClientId::new(),
            Money::from_major(500, Currency::KES),
            PaymentMethod::Mpesa,
            Some("QWE123".to_string()),
            now,
            now,
            Lateness::on_time(&Money::from_major(100, Currency::KES)),
            UserId::new(),
        );

        assert!(payment.reverse("  ", UserId::new(), now).is_err());
        assert!(payment.reverse("Duplicate entry", UserId::new(), now).is_ok());
        assert_eq!(payment.status, PaymentStatus::Reversed);
        assert!(matches!(
            payment.reverse("Again", UserId::new(), now),
            Err(LendingError::PaymentNotReversible { .. })
        ));
    }

    #[test]
    fn test_failed_payment_not_reversible() {
        let now = Utc::now();
        let mut payment = Payment::completed(
            document_number("PMT", 2024, 2),
            LoanId::new(),
            ClientId::new(),
            Money::from_major(500, Currency::KES),
            PaymentMethod::Cash,
            Some("ignored".to_string()),
            now,
            now,
            Lateness::on_time(&Money::from_major(100, Currency::KES)),
            UserId::new(),
        );
        assert!(payment.transaction_id.is_none());

        payment.fail("Bounced");
        assert!(payment.reverse("Cleanup", UserId::new(), now).is_err());
    }
}
