//! Payment application and reversal
//!
//! A repayment updates the loan first. The funds ledger post and, on
//! completion, the client's counters and score follow best-effort: once the
//! loan has committed, their failures become reconciliation records.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{ClientId, LoanId, Money, PaymentId, UserId};
use domain_funds::{repayment_description, reversal_description, FundsEntryType, PostingRequest};
use domain_lending::{
    assess_lateness, document_number, Lateness, Loan, Payment, PaymentMethod, RepaymentOutcome,
};

use crate::error::ServiceError;
use crate::locks::AggregateKey;
use crate::reconciliation::{ReconciliationOperation, ReconciliationRecord};
use crate::service::LendingCore;

const PAYMENT_NUMBER_PREFIX: &str = "PMT";

/// A repayment presented at the counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub loan_id: LoanId,
    /// Must be the loan's client
    pub client_id: ClientId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// Required for mpesa and bank, unique across payments
    pub transaction_id: Option<String>,
    /// Defaults to now
    pub payment_date: Option<DateTime<Utc>>,
    /// Defaults to the loan's due date
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub received_by: UserId,
}

impl RecordPaymentRequest {
    pub fn cash(loan_id: LoanId, client_id: ClientId, amount: Money, received_by: UserId) -> Self {
        Self {
            loan_id,
            client_id,
            amount,
            method: PaymentMethod::Cash,
            transaction_id: None,
            payment_date: None,
            due_date: None,
            notes: None,
            received_by,
        }
    }

    pub fn mpesa(
        loan_id: LoanId,
        client_id: ClientId,
        amount: Money,
        transaction_id: impl Into<String>,
        received_by: UserId,
    ) -> Self {
        Self {
            method: PaymentMethod::Mpesa,
            transaction_id: Some(transaction_id.into()),
            ..Self::cash(loan_id, client_id, amount, received_by)
        }
    }

    pub fn paid_on(mut self, payment_date: DateTime<Utc>) -> Self {
        self.payment_date = Some(payment_date);
        self
    }

    pub fn due_on(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

impl LendingCore {
    /// Records a repayment against a disbursed loan
    ///
    /// # Errors
    ///
    /// - `InvalidLoanState` unless the loan is disbursed and open
    /// - `Validation` for a bad amount, a missing or reused transaction
    ///   reference, or a client that does not own the loan
    #[instrument(
        skip(self, request),
        fields(loan_id = %request.loan_id, amount = %request.amount, method = ?request.method)
    )]
    pub async fn record_payment(&self, request: RecordPaymentRequest) -> Result<Payment, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(request.loan_id)).await;
        let loan = self.repos.loans.get_loan(request.loan_id).await?;
        self.apply_payment(loan, request).await.map_err(|e| {
            warn!(error = %e, "payment rejected");
            e
        })
    }

    /// Validates, applies and persists a payment; the caller holds the loan lock
    pub(crate) async fn apply_payment(&self, loan: Loan, request: RecordPaymentRequest) -> Result<Payment, ServiceError> {
        let now = self.now();
        loan.check_repayment(&request.amount)?;

        let transaction_id = request
            .transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if request.method.requires_reference() {
            let Some(reference) = transaction_id.as_deref() else {
                return Err(ServiceError::validation(
                    "Transaction ID is required for mpesa and bank payments",
                ));
            };
            if self.repos.payments.transaction_id_exists(reference).await? {
                return Err(ServiceError::validation("Transaction ID already exists"));
            }
        }
        if request.client_id != loan.client_id {
            return Err(ServiceError::validation("Payment client does not match the loan's client"));
        }
        let client = self.repos.clients.get_client(loan.client_id).await?;

        let payment_date = request.payment_date.unwrap_or(now);
        let due_date = request.due_date.unwrap_or(loan.due_date);
        let lateness = if request.method == PaymentMethod::Savings {
            Lateness::on_time(&loan.installment_amount)
        } else {
            assess_lateness(payment_date, due_date, &loan.installment_amount, loan.penalty_rate)
        };

        let year = payment_date.year();
        let sequence = self.repos.payments.next_payment_sequence(year).await?;
        let mut payment = Payment::completed(
            document_number(PAYMENT_NUMBER_PREFIX, year, sequence),
            loan.id,
            loan.client_id,
            request.amount,
            request.method,
            transaction_id,
            payment_date,
            due_date,
            lateness,
            request.received_by,
        );
        if let Some(notes) = request.notes {
            payment = payment.with_notes(notes);
        }

        let mut updated = loan;
        let outcome = updated.apply_repayment(&payment, &client.full_name())?;

        self.repos.payments.save_payment(&payment).await?;
        if let Err(e) = self.repos.loans.save_loan(&updated).await {
            payment.fail(&format!("Loan update failed: {}", e));
            if let Err(save_error) = self.repos.payments.save_payment(&payment).await {
                warn!(payment_id = %payment.id, error = %save_error, "could not mark payment failed");
            }
            return Err(e.into());
        }
        info!(
            payment_number = %payment.payment_number,
            loan_number = %updated.loan_number,
            late_days = payment.late_days,
            penalty = %payment.penalty_amount,
            remaining = %updated.remaining_balance,
            status = %outcome.status,
            "payment recorded"
        );

        if outcome.completed {
            self.record_completion(&updated, &outcome, now).await;
        }
        self.post_repayment(&updated, &payment, now).await;
        Ok(payment)
    }

    pub(crate) async fn record_completion(&self, loan: &Loan, outcome: &RepaymentOutcome, now: DateTime<Utc>) {
        let delta = self.scorer.policy().completion_adjustment(outcome.clean_history);
        let result = self
            .update_client(loan.client_id, |client| {
                client.record_repaid(now);
                client.adjust_credit_score(delta, now);
                Ok(())
            })
            .await;
        match result {
            Ok(client) => info!(
                loan_number = %loan.loan_number,
                credit_score = client.credit_score,
                "loan completed"
            ),
            Err(e) => {
                let record = ReconciliationRecord::new(ReconciliationOperation::CompletionCounters, now)
                    .for_loan(loan.id)
                    .for_client(loan.client_id);
                self.reconcile(record, &e).await;
            }
        }
    }

    async fn post_repayment(&self, loan: &Loan, payment: &Payment, now: DateTime<Utc>) {
        let mut description = repayment_description(&loan.loan_number);
        if payment.penalty_amount.is_positive() {
            description = format!(
                "{} ({} days late, penalty {})",
                description, payment.late_days, payment.penalty_amount
            );
        }
        self.post_funds_best_effort(
            PostingRequest::new(FundsEntryType::LoanRepayment, payment.amount, payment.received_by, now)
                .with_description(description)
                .with_loan(loan.id)
                .with_payment(payment.id),
            ReconciliationRecord::new(ReconciliationOperation::RepaymentPosting, now)
                .for_loan(loan.id)
                .for_payment(payment.id)
                .for_client(loan.client_id),
        )
        .await;
    }

    /// Reverses a completed payment
    ///
    /// The payment record stays, marked reversed. The loan gives back the
    /// amount and reopens if it had completed; the client counters and the
    /// funds ledger follow best-effort.
    #[instrument(skip(self, reason), fields(payment_id = %payment_id))]
    pub async fn reverse_payment(
        &self,
        payment_id: PaymentId,
        reason: &str,
        reversed_by: UserId,
    ) -> Result<Payment, ServiceError> {
        let loan_id = self.repos.payments.get_payment(payment_id).await?.loan_id;
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let now = self.now();

        // Re-read under the lock
        let original = self.repos.payments.get_payment(payment_id).await?;
        let mut payment = original.clone();
        payment.reverse(reason, reversed_by, now).map_err(|e| {
            warn!(error = %e, "reversal rejected");
            e
        })?;
        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        let outcome = loan.reverse_repayment(&payment, now)?;

        // The reversed status is stored first so a payment is never reversed twice
        self.repos.payments.save_payment(&payment).await?;
        if let Err(e) = self.repos.loans.save_loan(&loan).await {
            let e = ServiceError::from(e);
            warn!(payment_number = %payment.payment_number, error = %e, "loan not saved, restoring payment");
            if let Err(restore_error) = self.repos.payments.save_payment(&original).await {
                let record = ReconciliationRecord::new(ReconciliationOperation::ReversalRollback, now)
                    .for_loan(loan.id)
                    .for_payment(payment.id)
                    .for_client(loan.client_id)
                    .with_amount(payment.amount);
                self.reconcile(record, &ServiceError::from(restore_error)).await;
            }
            return Err(e);
        }
        info!(
            payment_number = %payment.payment_number,
            loan_number = %loan.loan_number,
            status = %outcome.status,
            reopened = outcome.reopened,
            "payment reversed"
        );

        if outcome.reopened {
            let result = self
                .update_client(loan.client_id, |client| {
                    client.record_reopened(now);
                    Ok(())
                })
                .await;
            if let Err(e) = result {
                let record = ReconciliationRecord::new(ReconciliationOperation::ReopenCounters, now)
                    .for_loan(loan.id)
                    .for_payment(payment.id)
                    .for_client(loan.client_id);
                self.reconcile(record, &e).await;
            }
        }

        self.post_funds_best_effort(
            PostingRequest::new(FundsEntryType::Expense, payment.amount, reversed_by, now)
                .with_description(reversal_description(&payment.payment_number))
                .with_loan(loan.id)
                .with_payment(payment.id),
            ReconciliationRecord::new(ReconciliationOperation::ReversalPosting, now)
                .for_loan(loan.id)
                .for_payment(payment.id),
        )
        .await;
        Ok(payment)
    }
}
