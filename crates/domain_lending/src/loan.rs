//! Loan aggregate and state machine
//!
//! # Lifecycle
//!
//! ```text
//! pending ──approve──▶ approved ──disburse──▶ active
//!    │                                          │  (recomputed after every payment)
//!    └──reject──▶ rejected                      ├──▶ on-track / ahead / at-risk
//!                                               ├──▶ completed   (remaining <= 0)
//!                                               └──▶ defaulted   (manual)
//! ```
//!
//! # Invariants
//!
//! - `remaining_balance == total_amount - amount_paid`, recomputed after every
//!   change and never decremented in place
//! - risk sub-states are derived from the latest payment, never set directly
//! - `completed`, `defaulted` and `rejected` are terminal; a reversed payment
//!   is the only way back out of `completed`

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use core_kernel::{
    ClientId, Currency, DurationUnit, InterestPlanId, ItemId, LoanId, Money, PaymentId, Rate,
    UserId,
};
use crate::calculator::{calculate_terms, due_date, LoanTerms};
use crate::error::LendingError;
use crate::item::Item;
use crate::payment::{Payment, PaymentStatus};
use crate::plan::{InterestPlan, ItemType, PaymentFrequency};

/// Share of the total above which a loan is considered ahead of schedule
const AHEAD_THRESHOLD: Decimal = dec!(0.8);

/// Loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    OnTrack,
    Ahead,
    AtRisk,
    Completed,
    Defaulted,
    Rejected,
}

impl LoanStatus {
    /// No further transitions except a reversal reopening `completed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Completed | LoanStatus::Defaulted | LoanStatus::Rejected)
    }

    /// Money has left the company and repayments are accepted
    pub fn is_disbursed(&self) -> bool {
        matches!(
            self,
            LoanStatus::Active | LoanStatus::OnTrack | LoanStatus::Ahead | LoanStatus::AtRisk
        )
    }

    /// Counts against the one-open-loan-per-client rule
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Transitions that may be requested explicitly
    ///
    /// Risk sub-states are absent on purpose: they only come out of
    /// repayment recomputation.
    pub fn can_transition_to(&self, target: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (*self, target),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, Active)
                | (Active, Completed)
                | (OnTrack, Completed)
                | (Ahead, Completed)
                | (AtRisk, Completed)
                | (Active, Defaulted)
                | (OnTrack, Defaulted)
                | (Ahead, Defaulted)
                | (AtRisk, Defaulted)
        )
    }

    pub fn all() -> [LoanStatus; 9] {
        use LoanStatus::*;
        [Pending, Approved, Active, OnTrack, Ahead, AtRisk, Completed, Defaulted, Rejected]
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::OnTrack => "on-track",
            LoanStatus::Ahead => "ahead",
            LoanStatus::AtRisk => "at-risk",
            LoanStatus::Completed => "completed",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Rejected => "rejected",
        };
        write!(f, "{}", label)
    }
}

/// Channel used to hand the principal to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisbursementMethod {
    Cash,
    Mpesa,
    Bank,
}

impl DisbursementMethod {
    pub fn requires_reference(&self) -> bool {
        !matches!(self, DisbursementMethod::Cash)
    }
}

/// Record of how and when a loan was disbursed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementDetails {
    pub method: DisbursementMethod,
    pub transaction_id: Option<String>,
    pub disbursed_at: DateTime<Utc>,
    pub disbursed_by: UserId,
}

impl DisbursementDetails {
    pub fn new(
        method: DisbursementMethod,
        transaction_id: Option<String>,
        disbursed_at: DateTime<Utc>,
        disbursed_by: UserId,
    ) -> Result<Self, LendingError> {
        let transaction_id = transaction_id.filter(|t| !t.trim().is_empty());
        if method.requires_reference() && transaction_id.is_none() {
            return Err(LendingError::validation(
                "Transaction ID is required for mpesa and bank disbursements",
            ));
        }
        Ok(Self {
            method,
            transaction_id: if method == DisbursementMethod::Cash { None } else { transaction_id },
            disbursed_at,
            disbursed_by,
        })
    }
}

/// Running record of late repayments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedPayments {
    pub count: u32,
    /// Sum of penalties assessed on late repayments
    pub total_amount: Money,
    pub last_missed_date: Option<DateTime<Utc>>,
}

/// One money movement into the loan (deposit or repayment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    /// None for the upfront deposit
    pub payment_id: Option<PaymentId>,
    pub date: DateTime<Utc>,
    pub amount: Money,
    pub paid_by: String,
    pub received_by: UserId,
}

/// Inputs for originating a loan
#[derive(Debug, Clone)]
pub struct LoanApplication<'a> {
    pub loan_number: String,
    pub client_id: ClientId,
    pub plan: &'a InterestPlan,
    /// Required for item plans
    pub item: Option<&'a Item>,
    /// Required for money plans; ignored for item plans
    pub principal: Option<Money>,
    /// Only used for money plans; item plans take the item's percentage
    pub deposit_percentage: Decimal,
    pub duration: u32,
    pub start_date: DateTime<Utc>,
    pub created_by: UserId,
}

/// Effect of a repayment on the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentOutcome {
    pub previous_status: LoanStatus,
    pub status: LoanStatus,
    /// The repayment moved the loan into `completed`
    pub completed: bool,
    /// No lateness was ever recorded on the loan
    pub clean_history: bool,
}

/// Effect of a payment reversal on the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversalOutcome {
    pub previous_status: LoanStatus,
    pub status: LoanStatus,
    /// The loan was completed and has been reopened
    pub reopened: bool,
}

/// A loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    /// Human-readable number, `LN-YYYY-NNNNNN`
    pub loan_number: String,
    pub client_id: ClientId,
    pub interest_plan_id: InterestPlanId,
    pub item_id: Option<ItemId>,
    pub loan_type: ItemType,
    /// Loan amount or item price
    pub principal: Money,
    pub interest_rate: Rate,
    pub penalty_rate: Rate,
    pub payment_frequency: PaymentFrequency,
    pub duration: u32,
    pub duration_unit: DurationUnit,
    pub interest_amount: Money,
    pub deposit_amount: Money,
    pub deposit_paid: bool,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub remaining_balance: Money,
    pub installment_amount: Money,
    pub installment_count: u32,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub expected_completion_date: DateTime<Utc>,
    pub status: LoanStatus,
    pub missed_payments: MissedPayments,
    pub payment_history: Vec<PaymentHistoryEntry>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub disbursement: Option<DisbursementDetails>,
    pub defaulted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Originates a pending loan from an application
    ///
    /// Item plans take their principal and deposit from the item, which must
    /// be active and in stock. Money plans take the requested principal.
    ///
    /// # Errors
    ///
    /// - `Validation` for an inactive plan or out-of-range amount/duration
    /// - `Validation` when the principal or item required by the plan is missing
    /// - `ItemUnavailable` for an inactive or out-of-stock item
    pub fn originate(application: LoanApplication<'_>) -> Result<Self, LendingError> {
        let plan = application.plan;

        let (principal, deposit_percentage, item_id) = match plan.item_type {
            ItemType::Item => {
                let item = application
                    .item
                    .ok_or_else(|| LendingError::validation("Item is required for item loans"))?;
                item.ensure_available()?;
                (item.actual_price, item.deposit_percentage, Some(item.id))
            }
            ItemType::Money => {
                let principal = application
                    .principal
                    .ok_or_else(|| LendingError::validation("Loan amount is required for money loans"))?;
                (principal, application.deposit_percentage, None)
            }
        };

        let terms = calculate_terms(plan, principal, application.duration, deposit_percentage)?;
        let due = due_date(application.start_date, terms.duration, terms.duration_unit)?;

        Ok(Self::from_terms(application, plan, item_id, terms, due))
    }

    fn from_terms(
        application: LoanApplication<'_>,
        plan: &InterestPlan,
        item_id: Option<ItemId>,
        terms: LoanTerms,
        due: DateTime<Utc>,
    ) -> Self {
        let currency = terms.principal.currency();
        let now = application.start_date;

        Self {
            id: LoanId::new_v7(),
            loan_number: application.loan_number,
            client_id: application.client_id,
            interest_plan_id: plan.id,
            item_id,
            loan_type: plan.item_type,
            principal: terms.principal,
            interest_rate: plan.interest_rate,
            penalty_rate: plan.penalty_rate,
            payment_frequency: plan.payment_frequency,
            duration: terms.duration,
            duration_unit: terms.duration_unit,
            interest_amount: terms.interest,
            deposit_amount: terms.deposit,
            deposit_paid: false,
            total_amount: terms.total,
            amount_paid: Money::zero(currency),
            remaining_balance: terms.total,
            installment_amount: terms.installment,
            installment_count: terms.installment_count,
            start_date: application.start_date,
            due_date: due,
            expected_completion_date: due,
            status: LoanStatus::Pending,
            missed_payments: MissedPayments {
                count: 0,
                total_amount: Money::zero(currency),
                last_missed_date: None,
            },
            payment_history: Vec::new(),
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            disbursement: None,
            defaulted_at: None,
            completed_at: None,
            created_by: application.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn currency(&self) -> Currency {
        self.total_amount.currency()
    }

    /// Approves a pending loan
    pub fn approve(&mut self, by: UserId, now: DateTime<Utc>) -> Result<(), LendingError> {
        self.transition(LoanStatus::Approved, now)?;
        self.approved_by = Some(by);
        self.approved_at = Some(now);
        Ok(())
    }

    /// Rejects a pending loan
    pub fn reject(&mut self, by: UserId, reason: &str, now: DateTime<Utc>) -> Result<(), LendingError> {
        if reason.trim().is_empty() {
            return Err(LendingError::validation("Rejection reason is required"));
        }
        self.transition(LoanStatus::Rejected, now)?;
        self.rejected_by = Some(by);
        self.rejected_at = Some(now);
        self.rejection_reason = Some(reason.trim().to_string());
        Ok(())
    }

    /// Moves an approved loan to `active`
    pub fn disburse(&mut self, details: DisbursementDetails) -> Result<(), LendingError> {
        let at = details.disbursed_at;
        self.transition(LoanStatus::Active, at)?;
        self.disbursement = Some(details);
        Ok(())
    }

    /// Marks a disbursed loan as defaulted
    pub fn mark_defaulted(&mut self, now: DateTime<Utc>) -> Result<(), LendingError> {
        self.transition(LoanStatus::Defaulted, now)?;
        self.defaulted_at = Some(now);
        Ok(())
    }

    /// Closes a disbursed loan that has nothing left to pay
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), LendingError> {
        if self.remaining_balance.is_positive() {
            return Err(LendingError::InvalidLoanState {
                loan_number: self.loan_number.clone(),
                status: self.status.to_string(),
                message: format!("{} is still outstanding", self.remaining_balance),
            });
        }
        self.transition(LoanStatus::Completed, now)?;
        self.completed_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, target: LoanStatus, now: DateTime<Utc>) -> Result<(), LendingError> {
        if !self.status.can_transition_to(target) {
            return Err(LendingError::transition(self.status, target));
        }
        debug!(loan = %self.loan_number, from = %self.status, to = %target, "loan status transition");
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Records the upfront deposit
    ///
    /// A deposit that clears a disbursed loan completes it. Before
    /// disbursement the deposit must leave a balance outstanding.
    ///
    /// # Errors
    ///
    /// - `InvalidLoanState` if the loan is closed or the deposit was already paid
    /// - `Validation` if the loan carries no deposit, or the amount is below
    ///   the deposit or above the remaining balance
    pub fn pay_deposit(
        &mut self,
        amount: Money,
        paid_by: &str,
        received_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<RepaymentOutcome, LendingError> {
        if self.status.is_terminal() {
            return Err(self.state_error("deposits are not accepted on closed loans"));
        }
        if self.deposit_paid {
            return Err(self.state_error("deposit already paid"));
        }
        self.total_amount.ensure_same_currency(&amount)?;
        if !self.deposit_amount.is_positive() {
            return Err(LendingError::validation("This loan has no deposit to pay"));
        }
        if amount < self.deposit_amount {
            return Err(LendingError::validation(format!(
                "Deposit amount must be at least {}",
                self.deposit_amount
            )));
        }
        if amount > self.remaining_balance {
            return Err(LendingError::validation(format!(
                "Deposit exceeds remaining balance of {}",
                self.remaining_balance
            )));
        }
        if amount == self.remaining_balance && !self.status.is_disbursed() {
            return Err(LendingError::validation(
                "Deposit must leave a balance outstanding on an undisbursed loan",
            ));
        }

        let previous_status = self.status;
        self.deposit_paid = true;
        self.amount_paid = self.amount_paid + amount;
        self.recompute_remaining();
        self.payment_history.push(PaymentHistoryEntry {
            payment_id: None,
            date: now,
            amount,
            paid_by: paid_by.to_string(),
            received_by,
        });
        if !self.remaining_balance.is_positive() {
            self.transition(LoanStatus::Completed, now)?;
            self.completed_at = Some(now);
        }
        self.updated_at = now;

        Ok(RepaymentOutcome {
            previous_status,
            status: self.status,
            completed: self.status == LoanStatus::Completed,
            clean_history: self.missed_payments.count == 0,
        })
    }

    /// Validates a prospective repayment without changing the loan
    ///
    /// # Errors
    ///
    /// - `InvalidLoanState` unless the loan has been disbursed and is still open
    /// - `Validation` for a non-positive amount or one above the remaining balance
    pub fn check_repayment(&self, amount: &Money) -> Result<(), LendingError> {
        if !self.status.is_disbursed() {
            return Err(self.state_error("repayments are only accepted on disbursed, open loans"));
        }
        self.total_amount.ensure_same_currency(amount)?;
        if !amount.is_positive() {
            return Err(LendingError::validation("Payment amount must be greater than 0"));
        }
        if *amount > self.remaining_balance {
            return Err(LendingError::validation(format!(
                "Payment amount exceeds remaining balance of {}",
                self.remaining_balance
            )));
        }
        Ok(())
    }

    /// Applies an accepted repayment and recomputes the status
    ///
    /// Status after the payment:
    /// - remaining <= 0 → `completed`
    /// - paid late → `at-risk`
    /// - more than 80% of the total paid → `ahead`
    /// - otherwise → `on-track`
    pub fn apply_repayment(
        &mut self,
        payment: &Payment,
        paid_by: &str,
    ) -> Result<RepaymentOutcome, LendingError> {
        if payment.loan_id != self.id {
            return Err(LendingError::validation("Payment does not belong to this loan"));
        }
        self.check_repayment(&payment.amount)?;

        let previous_status = self.status;
        let now = payment.payment_date;

        self.amount_paid = self.amount_paid + payment.amount;
        self.recompute_remaining();

        if !payment.is_on_time {
            self.missed_payments.count += 1;
            self.missed_payments.total_amount = self.missed_payments.total_amount + payment.penalty_amount;
            self.missed_payments.last_missed_date = Some(payment.payment_date);
        }

        self.payment_history.push(PaymentHistoryEntry {
            payment_id: Some(payment.id),
            date: payment.payment_date,
            amount: payment.amount,
            paid_by: paid_by.to_string(),
            received_by: payment.received_by,
        });

        self.status = if !self.remaining_balance.is_positive() {
            self.completed_at = Some(now);
            LoanStatus::Completed
        } else if !payment.is_on_time {
            LoanStatus::AtRisk
        } else if self.amount_paid.amount() > self.total_amount.amount() * AHEAD_THRESHOLD {
            LoanStatus::Ahead
        } else {
            LoanStatus::OnTrack
        };
        self.updated_at = now;

        Ok(RepaymentOutcome {
            previous_status,
            status: self.status,
            completed: self.status == LoanStatus::Completed && previous_status != LoanStatus::Completed,
            clean_history: self.missed_payments.count == 0,
        })
    }

    /// Undoes a reversed payment's effect on the loan
    ///
    /// `amount_paid` is reduced (floored at zero), the matching history entry
    /// is dropped and a completed loan reopens as `active`.
    pub fn reverse_repayment(
        &mut self,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> Result<ReversalOutcome, LendingError> {
        if payment.loan_id != self.id {
            return Err(LendingError::validation("Payment does not belong to this loan"));
        }
        if payment.status != PaymentStatus::Reversed {
            return Err(LendingError::validation(
                "Only reversed payments can be unwound from a loan",
            ));
        }
        self.total_amount.ensure_same_currency(&payment.amount)?;

        let previous_status = self.status;

        self.amount_paid = (self.amount_paid - payment.amount).clamp_non_negative();
        self.recompute_remaining();
        self.payment_history
            .retain(|entry| entry.payment_id != Some(payment.id));

        let reopened = previous_status == LoanStatus::Completed && self.remaining_balance.is_positive();
        if reopened {
            self.status = LoanStatus::Active;
            self.completed_at = None;
        }
        self.updated_at = now;

        Ok(ReversalOutcome {
            previous_status,
            status: self.status,
            reopened,
        })
    }

    /// Disbursed, still open and past its final due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::AtRisk) && self.due_date < now
    }

    /// True when the stored balance matches `total - paid`
    pub fn balance_is_consistent(&self) -> bool {
        self.remaining_balance == self.total_amount - self.amount_paid
    }

    fn recompute_remaining(&mut self) {
        self.remaining_balance = self.total_amount - self.amount_paid;
    }

    fn state_error(&self, message: &str) -> LendingError {
        LendingError::InvalidLoanState {
            loan_number: self.loan_number.clone(),
            status: self.status.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::payment::{assess_lateness, document_number, PaymentMethod};

    fn kes(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn plan() -> InterestPlan {
        InterestPlan::new("Daily", ItemType::Money, PaymentFrequency::Daily, dec!(10), Currency::KES)
            .with_penalty_percentage(dec!(2))
    }

    fn active_loan() -> Loan {
        let plan = plan();
        let mut loan = Loan::originate(LoanApplication {
            loan_number: document_number("LN", 2024, 1),
            client_id: ClientId::new(),
            plan: &plan,
            item: None,
            principal: Some(kes(1000)),
            deposit_percentage: Decimal::ZERO,
            duration: 30,
            start_date: start(),
            created_by: UserId::new(),
        })
        .unwrap();
        loan.approve(UserId::new(), start()).unwrap();
        loan.disburse(DisbursementDetails::new(DisbursementMethod::Cash, None, start(), UserId::new()).unwrap())
            .unwrap();
        loan
    }

    fn payment_for(loan: &Loan, amount: i64, paid_at: DateTime<Utc>) -> Payment {
        let lateness = assess_lateness(paid_at, loan.due_date, &loan.installment_amount, loan.penalty_rate);
        Payment::completed(
            document_number("PMT", 2024, 1),
            loan.id,
            loan.client_id,
            kes(amount),
            PaymentMethod::Cash,
            None,
            paid_at,
            loan.due_date,
            lateness,
            UserId::new(),
        )
    }

    #[test]
    fn test_originate_snapshots_terms() {
        let loan = active_loan();
        assert_eq!(loan.total_amount, kes(1100));
        assert_eq!(loan.remaining_balance, kes(1100));
        assert_eq!(loan.installment_amount, kes(37));
        assert_eq!(loan.due_date, start() + Duration::days(30));
        assert_eq!(loan.expected_completion_date, loan.due_date);
        assert_eq!(loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_full_on_time_payment_completes() {
        let mut loan = active_loan();
        let payment = payment_for(&loan, 1100, start() + Duration::days(5));

        let outcome = loan.apply_repayment(&payment, "Jane").unwrap();

        assert!(outcome.completed);
        assert!(outcome.clean_history);
        assert_eq!(loan.amount_paid, kes(1100));
        assert!(loan.remaining_balance.is_zero());
        assert_eq!(loan.status, LoanStatus::Completed);
    }

    #[test]
    fn test_overpayment_rejected() {
        let loan = active_loan();
        let result = loan.check_repayment(&kes(1101));
        assert!(matches!(result, Err(LendingError::Validation(_))));
    }

    #[test]
    fn test_late_payment_sets_at_risk() {
        let mut loan = active_loan();
        let payment = payment_for(&loan, 100, loan.due_date + Duration::days(10));

        let outcome = loan.apply_repayment(&payment, "Jane").unwrap();

        assert_eq!(outcome.status, LoanStatus::AtRisk);
        assert_eq!(loan.missed_payments.count, 1);
        assert_eq!(loan.missed_payments.total_amount, kes(8));
    }

    #[test]
    fn test_ahead_after_eighty_percent() {
        let mut loan = active_loan();
        let payment = payment_for(&loan, 900, start() + Duration::days(1));
        loan.apply_repayment(&payment, "Jane").unwrap();
        assert_eq!(loan.status, LoanStatus::Ahead);
    }

    #[test]
    fn test_pending_loan_rejects_repayment() {
        let plan = plan();
        let loan = Loan::originate(LoanApplication {
            loan_number: document_number("LN", 2024, 2),
            client_id: ClientId::new(),
            plan: &plan,
            item: None,
            principal: Some(kes(1000)),
            deposit_percentage: Decimal::ZERO,
            duration: 30,
            start_date: start(),
            created_by: UserId::new(),
        })
        .unwrap();

        assert!(matches!(loan.check_repayment(&kes(10)), Err(LendingError::InvalidLoanState { .. })));
    }

    #[test]
    fn test_transition_table() {
        assert!(LoanStatus::Pending.can_transition_to(LoanStatus::Approved));
        assert!(!LoanStatus::Approved.can_transition_to(LoanStatus::Rejected));
        assert!(!LoanStatus::Pending.can_transition_to(LoanStatus::Active));
        assert!(!LoanStatus::Active.can_transition_to(LoanStatus::AtRisk));
        assert!(!LoanStatus::Completed.can_transition_to(LoanStatus::Active));
    }

    #[test]
    fn test_reversal_reopens_completed_loan() {
        let mut loan = active_loan();
        let mut payment = payment_for(&loan, 1100, start() + Duration::days(2));
        loan.apply_repayment(&payment, "Jane").unwrap();

        payment.reverse("Wrong loan", UserId::new(), start() + Duration::days(3)).unwrap();
        let outcome = loan.reverse_repayment(&payment, start() + Duration::days(3)).unwrap();

        assert!(outcome.reopened);
        assert_eq!(loan.status, LoanStatus::Active);
        assert!(loan.amount_paid.is_zero());
        assert_eq!(loan.remaining_balance, kes(1100));
        assert!(loan.payment_history.is_empty());
        assert!(loan.balance_is_consistent());
    }
}
