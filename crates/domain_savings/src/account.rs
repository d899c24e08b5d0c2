//! Savings account aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{
    whole_days_between, ClientId, Currency, LoanId, Money, SavingsAccountId, SavingsTransactionId, UserId,
};

use crate::error::SavingsError;
use crate::transaction::{SavingsPaymentMethod, SavingsTransaction, SavingsTransactionType, TellerRequest};

const DAYS_PER_YEAR: Decimal = dec!(365);

struct Movement {
    kind: SavingsTransactionType,
    amount: Money,
    method: SavingsPaymentMethod,
    reference: Option<String>,
    loan_id: Option<LoanId>,
    notes: Option<String>,
    by: UserId,
    at: DateTime<Utc>,
}

/// A random 10-digit account number
///
/// Uniqueness is checked against storage by the caller.
pub fn generate_savings_number() -> String {
    let n = Uuid::new_v4().as_u128() % 9_000_000_000 + 1_000_000_000;
    n.to_string()
}

/// Simple daily interest: `balance * rate / 100 / 365 * days`, to the cent
pub fn simple_interest(balance: &Money, annual_rate: Decimal, days: i64) -> Money {
    let daily = annual_rate / dec!(100) / DAYS_PER_YEAR;
    Money::new((balance.amount() * daily * Decimal::from(days)).round_dp(2), balance.currency())
}

fn validate_rate(rate: Decimal) -> Result<(), SavingsError> {
    if rate < Decimal::ZERO || rate > dec!(100) {
        return Err(SavingsError::validation("Interest rate must be between 0 and 100"));
    }
    Ok(())
}

/// A client's savings account with its full transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsAccount {
    pub id: SavingsAccountId,
    pub client_id: ClientId,
    pub savings_number: String,
    pub current_balance: Money,
    pub total_deposits: Money,
    pub total_withdrawals: Money,
    /// Annual percent
    pub interest_rate: Decimal,
    pub last_interest_calculation: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Oldest first
    pub transactions: Vec<SavingsTransaction>,
}

impl SavingsAccount {
    /// Opens an empty account; the rate defaults to 0
    pub fn open(
        client_id: ClientId,
        savings_number: String,
        interest_rate: Option<Decimal>,
        currency: Currency,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, SavingsError> {
        let interest_rate = interest_rate.unwrap_or(Decimal::ZERO);
        validate_rate(interest_rate)?;
        if savings_number.len() != 10 || !savings_number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SavingsError::validation("Savings number must be 10 digits"));
        }

        let zero = Money::zero(currency);
        Ok(Self {
            id: SavingsAccountId::new_v7(),
            client_id,
            savings_number,
            current_balance: zero,
            total_deposits: zero,
            total_withdrawals: zero,
            interest_rate,
            last_interest_calculation: None,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
            transactions: Vec::new(),
        })
    }

    pub fn currency(&self) -> Currency {
        self.current_balance.currency()
    }

    /// Changes the rate and/or the active flag
    pub fn update(
        &mut self,
        interest_rate: Option<Decimal>,
        is_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<(), SavingsError> {
        if let Some(rate) = interest_rate {
            validate_rate(rate)?;
        }
        if let Some(rate) = interest_rate {
            self.interest_rate = rate;
        }
        if let Some(active) = is_active {
            if active != self.is_active {
                debug!(account = %self.savings_number, active, "savings account activation changed");
            }
            self.is_active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SavingsError> {
        if !self.is_active {
            return Err(SavingsError::Inactive {
                savings_number: self.savings_number.clone(),
            });
        }
        Ok(())
    }

    fn ensure_positive(&self, amount: &Money) -> Result<(), SavingsError> {
        self.current_balance.ensure_same_currency(amount)?;
        if !amount.is_positive() {
            return Err(SavingsError::validation("Amount must be greater than 0"));
        }
        Ok(())
    }

    fn ensure_covers(&self, amount: &Money) -> Result<(), SavingsError> {
        if *amount > self.current_balance {
            return Err(SavingsError::InsufficientFunds {
                available: self.current_balance.to_string(),
                requested: amount.to_string(),
            });
        }
        Ok(())
    }

    fn teller_reference(request: &TellerRequest) -> Result<Option<String>, SavingsError> {
        if !request.method.is_teller_method() {
            return Err(SavingsError::validation(format!(
                "Payment method {:?} is reserved for internal movements",
                request.method
            )));
        }
        let reference = request
            .transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        if request.method.requires_reference() && reference.is_none() {
            return Err(SavingsError::validation("Transaction ID is required for mpesa payments"));
        }
        // Only mpesa movements keep their reference
        Ok(reference.filter(|_| request.method.requires_reference()))
    }

    fn append(&mut self, movement: Movement) -> &SavingsTransaction {
        let balance_after = if movement.kind.is_credit() {
            self.current_balance + movement.amount
        } else {
            self.current_balance - movement.amount
        };
        debug!(
            account = %self.savings_number,
            kind = ?movement.kind,
            amount = %movement.amount,
            balance = %balance_after,
            "savings movement"
        );
        self.current_balance = balance_after;
        self.updated_at = movement.at;
        let index = self.transactions.len();
        self.transactions.push(SavingsTransaction {
            id: SavingsTransactionId::new_v7(),
            account_id: self.id,
            client_id: self.client_id,
            transaction_type: movement.kind,
            amount: movement.amount,
            payment_method: movement.method,
            transaction_id: movement.reference,
            processed_by: movement.by,
            loan_id: movement.loan_id,
            notes: movement.notes,
            balance_after,
            created_at: movement.at,
        });
        &self.transactions[index]
    }

    /// True if a deposit on this account already carries `reference`
    pub fn has_deposit_reference(&self, reference: &str) -> bool {
        self.transactions.iter().any(|t| {
            t.transaction_type == SavingsTransactionType::Deposit && t.transaction_id.as_deref() == Some(reference)
        })
    }

    pub fn deposit(&mut self, request: TellerRequest) -> Result<&SavingsTransaction, SavingsError> {
        self.ensure_positive(&request.amount)?;
        let reference = Self::teller_reference(&request)?;
        self.ensure_active()?;
        if let Some(reference) = reference.as_deref() {
            if self.has_deposit_reference(reference) {
                return Err(SavingsError::validation("Transaction ID already exists"));
            }
        }

        self.total_deposits = self.total_deposits + request.amount;
        Ok(self.append(Movement {
            kind: SavingsTransactionType::Deposit,
            amount: request.amount,
            method: request.method,
            reference,
            loan_id: None,
            notes: request.notes,
            by: request.processed_by,
            at: request.at,
        }))
    }

    pub fn withdraw(&mut self, request: TellerRequest) -> Result<&SavingsTransaction, SavingsError> {
        self.ensure_positive(&request.amount)?;
        let reference = Self::teller_reference(&request)?;
        self.ensure_active()?;
        self.ensure_covers(&request.amount)?;

        self.total_withdrawals = self.total_withdrawals + request.amount;
        Ok(self.append(Movement {
            kind: SavingsTransactionType::Withdrawal,
            amount: request.amount,
            method: request.method,
            reference,
            loan_id: None,
            notes: request.notes,
            by: request.processed_by,
            at: request.at,
        }))
    }

    /// Whole days since the last accrual, or since opening
    pub fn days_since_accrual(&self, now: DateTime<Utc>) -> i64 {
        whole_days_between(self.last_interest_calculation.unwrap_or(self.created_at), now)
    }

    /// Interest that `accrue_interest` would credit at `now`
    pub fn pending_interest(&self, now: DateTime<Utc>) -> Money {
        simple_interest(&self.current_balance, self.interest_rate, self.days_since_accrual(now).max(0))
    }

    /// Credits simple interest for the days since the last accrual
    pub fn accrue_interest(&mut self, by: UserId, now: DateTime<Utc>) -> Result<&SavingsTransaction, SavingsError> {
        if self.interest_rate <= Decimal::ZERO {
            return Err(SavingsError::nothing_to_accrue("Interest rate is 0, no interest to calculate"));
        }
        let days = self.days_since_accrual(now);
        if days < 1 {
            return Err(SavingsError::nothing_to_accrue("Interest can only be calculated once per day"));
        }
        let interest = simple_interest(&self.current_balance, self.interest_rate, days);
        if !interest.is_positive() {
            return Err(SavingsError::nothing_to_accrue("No interest to add (zero or negative amount)"));
        }

        self.last_interest_calculation = Some(now);
        let note = format!(
            "Interest calculated for {} days at {}% rate",
            days,
            self.interest_rate.normalize()
        );
        Ok(self.append(Movement {
            kind: SavingsTransactionType::Interest,
            amount: interest,
            method: SavingsPaymentMethod::System,
            reference: None,
            loan_id: None,
            notes: Some(note),
            by,
            at: now,
        }))
    }

    /// Checks that `amount` can be moved to `loan` without changing anything
    ///
    /// `loan_client` and `loan_remaining` describe the target loan.
    pub fn check_loan_repayment(
        &self,
        amount: &Money,
        loan_client: ClientId,
        loan_remaining: &Money,
    ) -> Result<(), SavingsError> {
        self.ensure_positive(amount)?;
        self.ensure_active()?;
        if loan_client != self.client_id {
            return Err(SavingsError::validation("Loan does not belong to the savings account owner"));
        }
        self.ensure_covers(amount)?;
        if amount > loan_remaining {
            return Err(SavingsError::validation(format!(
                "Amount exceeds loan remaining balance of {}",
                loan_remaining
            )));
        }
        Ok(())
    }

    /// Debits savings toward a loan
    pub fn debit_for_loan(
        &mut self,
        amount: Money,
        loan_id: LoanId,
        loan_client: ClientId,
        loan_remaining: &Money,
        notes: Option<String>,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&SavingsTransaction, SavingsError> {
        self.check_loan_repayment(&amount, loan_client, loan_remaining)?;
        self.total_withdrawals = self.total_withdrawals + amount;
        Ok(self.append(Movement {
            kind: SavingsTransactionType::LoanRepayment,
            amount,
            method: SavingsPaymentMethod::Savings,
            reference: None,
            loan_id: Some(loan_id),
            notes,
            by,
            at,
        }))
    }

    /// Puts back a loan debit whose payment could not be applied
    ///
    /// The compensation is a system deposit; the debit stays in the history.
    pub fn compensate_loan_debit(
        &mut self,
        debit_id: SavingsTransactionId,
        reason: &str,
        by: UserId,
        at: DateTime<Utc>,
    ) -> Result<&SavingsTransaction, SavingsError> {
        let debit = self
            .transactions
            .iter()
            .find(|t| t.id == debit_id && t.transaction_type == SavingsTransactionType::LoanRepayment)
            .ok_or_else(|| SavingsError::validation(format!("No loan repayment {} on this account", debit_id)))?;
        let (amount, loan_id) = (debit.amount, debit.loan_id);

        self.total_deposits = self.total_deposits + amount;
        Ok(self.append(Movement {
            kind: SavingsTransactionType::Deposit,
            amount,
            method: SavingsPaymentMethod::System,
            reference: None,
            loan_id,
            notes: Some(format!("Reversal of savings loan repayment: {}", reason)),
            by,
            at,
        }))
    }

    /// Signed sum of the history; equals the balance for a consistent account
    pub fn ledger_balance(&self) -> Result<Money, SavingsError> {
        let mut balance = Money::zero(self.currency());
        for transaction in &self.transactions {
            balance = balance.checked_add(&transaction.signed_amount())?;
            if balance != transaction.balance_after || balance.is_negative() {
                return Err(SavingsError::validation(format!(
                    "Savings ledger broken at transaction {}",
                    transaction.id
                )));
            }
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn opened() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()
    }

    fn kes(units: i64) -> Money {
        Money::from_major(units, Currency::KES)
    }

    fn account(rate: Decimal) -> SavingsAccount {
        SavingsAccount::open(
            ClientId::new(),
            generate_savings_number(),
            Some(rate),
            Currency::KES,
            UserId::new(),
            opened(),
        )
        .unwrap()
    }

    #[test]
    fn test_savings_number_shape() {
        for _ in 0..50 {
            let n = generate_savings_number();
            assert_eq!(n.len(), 10);
            assert!(!n.starts_with('0'));
        }
    }

    #[test]
    fn test_rate_bounds() {
        let result = SavingsAccount::open(
            ClientId::new(),
            generate_savings_number(),
            Some(dec!(101)),
            Currency::KES,
            UserId::new(),
            opened(),
        );
        assert!(matches!(result, Err(SavingsError::Validation(_))));

        let mut account = account(dec!(5));
        assert!(account.update(Some(dec!(-1)), Some(false), opened()).is_err());
        assert!(account.is_active);
        account.update(Some(dec!(8)), None, opened()).unwrap();
        assert_eq!(account.interest_rate, dec!(8));
    }

    #[test]
    fn test_simple_interest_rounds_to_cents() {
        assert_eq!(simple_interest(&kes(1000), dec!(12), 30).amount(), dec!(9.86));
    }

    #[test]
    fn test_accrual_needs_a_full_day() {
        let mut account = account(dec!(12));
        account.deposit(TellerRequest::cash(kes(1000), UserId::new(), opened())).unwrap();

        let err = account.accrue_interest(UserId::new(), opened() + Duration::hours(23)).unwrap_err();
        assert!(matches!(err, SavingsError::NothingToAccrue(_)));
        assert!(account.last_interest_calculation.is_none());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut account = account(Decimal::ZERO);
        account.deposit(TellerRequest::cash(kes(1000), UserId::new(), opened())).unwrap();
        assert!(account.accrue_interest(UserId::new(), opened() + Duration::days(10)).is_err());
    }

    #[test]
    fn test_internal_methods_not_for_tellers() {
        let mut account = account(dec!(5));
        let mut request = TellerRequest::cash(kes(100), UserId::new(), opened());
        request.method = SavingsPaymentMethod::System;
        assert!(account.deposit(request).is_err());
    }

    #[test]
    fn test_cash_reference_dropped() {
        let mut account = account(dec!(5));
        let mut request = TellerRequest::cash(kes(100), UserId::new(), opened());
        request.transaction_id = Some("IGNORED".into());
        let txn = account.deposit(request).unwrap();
        assert!(txn.transaction_id.is_none());
    }
}
