//! Savings accounts and repayment from savings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{ClientId, LoanId, Money, SavingsAccountId, SavingsTransactionId, UserId};
use domain_lending::{Payment, PaymentMethod};
use domain_savings::{
    generate_savings_number, SavingsAccount, SavingsPaymentMethod, SavingsTransaction, TellerRequest,
};

use crate::error::ServiceError;
use crate::locks::AggregateKey;
use crate::payments::RecordPaymentRequest;
use crate::reconciliation::{ReconciliationOperation, ReconciliationRecord};
use crate::service::LendingCore;

const SAVINGS_NUMBER_ATTEMPTS: usize = 10;

/// A teller deposit or withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsMovementRequest {
    pub amount: Money,
    pub method: SavingsPaymentMethod,
    /// Required for mpesa
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub processed_by: UserId,
}

impl SavingsMovementRequest {
    pub fn cash(amount: Money, processed_by: UserId) -> Self {
        Self {
            amount,
            method: SavingsPaymentMethod::Cash,
            transaction_id: None,
            notes: None,
            processed_by,
        }
    }

    pub fn mpesa(amount: Money, transaction_id: impl Into<String>, processed_by: UserId) -> Self {
        Self {
            method: SavingsPaymentMethod::Mpesa,
            transaction_id: Some(transaction_id.into()),
            ..Self::cash(amount, processed_by)
        }
    }

    fn into_teller(self, at: DateTime<Utc>) -> TellerRequest {
        TellerRequest {
            amount: self.amount,
            method: self.method,
            transaction_id: self.transaction_id,
            notes: self.notes,
            processed_by: self.processed_by,
            at,
        }
    }
}

impl LendingCore {
    /// Opens a savings account; a client has at most one active account
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn create_savings_account(
        &self,
        client_id: ClientId,
        interest_rate: Option<Decimal>,
        created_by: UserId,
    ) -> Result<SavingsAccount, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Client(client_id)).await;
        self.repos.clients.get_client(client_id).await?;
        if self.repos.savings.find_active_for_client(client_id).await?.is_some() {
            return Err(ServiceError::validation("Client already has an active savings account"));
        }

        let savings_number = self.unused_savings_number().await?;
        let account = SavingsAccount::open(
            client_id,
            savings_number,
            interest_rate,
            self.currency,
            created_by,
            self.now(),
        )?;
        self.repos.savings.save_account(&account).await?;
        info!(
            account_id = %account.id,
            savings_number = %account.savings_number,
            rate = %account.interest_rate,
            "savings account opened"
        );
        Ok(account)
    }

    async fn unused_savings_number(&self) -> Result<String, ServiceError> {
        for _ in 0..SAVINGS_NUMBER_ATTEMPTS {
            let candidate = generate_savings_number();
            if !self.repos.savings.savings_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(ServiceError::validation("Could not allocate a unique savings number"))
    }

    /// Changes the interest rate and/or the active flag
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn update_savings_account(
        &self,
        account_id: SavingsAccountId,
        interest_rate: Option<Decimal>,
        is_active: Option<bool>,
    ) -> Result<SavingsAccount, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Savings(account_id)).await;
        let mut account = self.repos.savings.get_account(account_id).await?;
        account.update(interest_rate, is_active, self.now())?;
        self.repos.savings.save_account(&account).await?;
        info!(rate = %account.interest_rate, is_active = account.is_active, "savings account updated");
        Ok(account)
    }

    #[instrument(skip(self, request), fields(account_id = %account_id, amount = %request.amount))]
    pub async fn deposit_savings(
        &self,
        account_id: SavingsAccountId,
        request: SavingsMovementRequest,
    ) -> Result<SavingsTransaction, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Savings(account_id)).await;
        let mut account = self.repos.savings.get_account(account_id).await?;
        let transaction = account
            .deposit(request.into_teller(self.now()))
            .map_err(|e| {
                warn!(error = %e, "savings deposit rejected");
                e
            })?
            .clone();
        self.repos.savings.save_account(&account).await?;
        info!(balance = %account.current_balance, "savings deposit recorded");
        Ok(transaction)
    }

    #[instrument(skip(self, request), fields(account_id = %account_id, amount = %request.amount))]
    pub async fn withdraw_savings(
        &self,
        account_id: SavingsAccountId,
        request: SavingsMovementRequest,
    ) -> Result<SavingsTransaction, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Savings(account_id)).await;
        let mut account = self.repos.savings.get_account(account_id).await?;
        let transaction = account
            .withdraw(request.into_teller(self.now()))
            .map_err(|e| {
                warn!(error = %e, "savings withdrawal rejected");
                e
            })?
            .clone();
        self.repos.savings.save_account(&account).await?;
        info!(balance = %account.current_balance, "savings withdrawal recorded");
        Ok(transaction)
    }

    /// Credits interest for the whole days since the last accrual
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn accrue_interest(
        &self,
        account_id: SavingsAccountId,
        processed_by: UserId,
    ) -> Result<SavingsTransaction, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Savings(account_id)).await;
        let mut account = self.repos.savings.get_account(account_id).await?;
        let transaction = account.accrue_interest(processed_by, self.now())?.clone();
        self.repos.savings.save_account(&account).await?;
        info!(interest = %transaction.amount, balance = %account.current_balance, "savings interest accrued");
        Ok(transaction)
    }

    /// Moves savings onto a loan the account owner holds
    ///
    /// The savings debit is saved first, then the payment goes through the
    /// normal repayment path as an on-time `savings` payment. If that fails
    /// the debit is compensated with a system deposit and the payment error
    /// is returned.
    #[instrument(skip(self, notes), fields(account_id = %account_id, loan_id = %loan_id, amount = %amount))]
    pub async fn repay_loan_from_savings(
        &self,
        account_id: SavingsAccountId,
        loan_id: LoanId,
        amount: Money,
        notes: Option<String>,
        processed_by: UserId,
    ) -> Result<Payment, ServiceError> {
        let _guards = self
            .locks
            .lock_all(&[AggregateKey::Savings(account_id), AggregateKey::Loan(loan_id)])
            .await;
        let now = self.now();

        let mut account = self.repos.savings.get_account(account_id).await?;
        let loan = self.repos.loans.get_loan(loan_id).await?;
        account.check_loan_repayment(&amount, loan.client_id, &loan.remaining_balance)?;
        loan.check_repayment(&amount)?;

        let debit_id = account
            .debit_for_loan(
                amount,
                loan.id,
                loan.client_id,
                &loan.remaining_balance,
                notes.clone(),
                processed_by,
                now,
            )?
            .id;
        self.repos.savings.save_account(&account).await?;
        info!(balance = %account.current_balance, "savings debited for loan repayment");

        let request = RecordPaymentRequest {
            loan_id: loan.id,
            client_id: account.client_id,
            amount,
            method: PaymentMethod::Savings,
            transaction_id: None,
            payment_date: Some(now),
            due_date: None,
            notes,
            received_by: processed_by,
        };
        match self.apply_payment(loan, request).await {
            Ok(payment) => Ok(payment),
            Err(cause) => {
                warn!(error = %cause, "payment from savings failed, compensating the debit");
                self.compensate_savings_debit(account, debit_id, amount, &cause, processed_by).await;
                Err(cause)
            }
        }
    }

    async fn compensate_savings_debit(
        &self,
        mut account: SavingsAccount,
        debit_id: SavingsTransactionId,
        amount: Money,
        cause: &ServiceError,
        processed_by: UserId,
    ) {
        let now = self.now();
        let result: Result<(), ServiceError> = async {
            account.compensate_loan_debit(debit_id, &cause.to_string(), processed_by, now)?;
            self.repos.savings.save_account(&account).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => info!(balance = %account.current_balance, "savings debit compensated"),
            Err(e) => {
                let record = ReconciliationRecord::new(ReconciliationOperation::SavingsCompensation, now)
                    .for_savings(account.id)
                    .for_client(account.client_id)
                    .with_amount(amount);
                self.reconcile(record, &e).await;
            }
        }
    }
}
