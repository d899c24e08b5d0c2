//! Loan origination and lifecycle

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{ClientId, InterestPlanId, ItemId, LoanId, Money, UserId};
use domain_client::ClientError;
use domain_funds::{disbursement_description, disbursement_rollback_description, FundsEntryType, PostingRequest};
use domain_lending::{
    calculate_terms, document_number, DisbursementDetails, DisbursementMethod, ItemType, Loan, LoanApplication,
    LoanQuery, LoanStatus, LoanTerms,
};

use crate::error::ServiceError;
use crate::locks::AggregateKey;
use crate::reconciliation::{ReconciliationOperation, ReconciliationRecord};
use crate::service::LendingCore;

const LOAN_NUMBER_PREFIX: &str = "LN";

/// Application for a new loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub client_id: ClientId,
    pub interest_plan_id: InterestPlanId,
    /// Requested amount; money plans only
    pub principal: Option<Money>,
    /// Financed item; item plans only
    pub item_id: Option<ItemId>,
    /// Upfront deposit for money loans, 0 when absent
    pub deposit_percentage: Option<Decimal>,
    pub duration: u32,
    pub created_by: UserId,
}

/// How a loan is paid out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisburseRequest {
    pub method: DisbursementMethod,
    pub transaction_id: Option<String>,
    /// Defaults to now
    pub disbursed_at: Option<DateTime<Utc>>,
    pub disbursed_by: UserId,
}

impl DisburseRequest {
    pub fn cash(disbursed_by: UserId) -> Self {
        Self {
            method: DisbursementMethod::Cash,
            transaction_id: None,
            disbursed_at: None,
            disbursed_by,
        }
    }

    pub fn mpesa(transaction_id: impl Into<String>, disbursed_by: UserId) -> Self {
        Self {
            method: DisbursementMethod::Mpesa,
            transaction_id: Some(transaction_id.into()),
            disbursed_at: None,
            disbursed_by,
        }
    }
}

impl LendingCore {
    /// Prices a loan under a plan without creating anything
    #[instrument(skip(self), fields(plan_id = %plan_id))]
    pub async fn calculate_loan_terms(
        &self,
        plan_id: InterestPlanId,
        principal: Money,
        duration: u32,
        deposit_percentage: Option<Decimal>,
    ) -> Result<LoanTerms, ServiceError> {
        let plan = self.repos.plans.get_plan(plan_id).await?;
        Ok(calculate_terms(
            &plan,
            principal,
            duration,
            deposit_percentage.unwrap_or(Decimal::ZERO),
        )?)
    }

    /// Creates a pending loan
    ///
    /// # Errors
    ///
    /// - `IneligibleClient` if the client is blacklisted or already has an open loan
    /// - `NotFound` for an unknown client, plan or item
    /// - `Validation` if the plan rejects the amount or duration
    #[instrument(skip(self, request), fields(client_id = %request.client_id, plan_id = %request.interest_plan_id))]
    pub async fn create_loan(&self, request: CreateLoanRequest) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Client(request.client_id)).await;
        let now = self.now();

        let client = self.repos.clients.get_client(request.client_id).await?;
        client.ensure_can_borrow()?;

        let open = self
            .repos
            .loans
            .find_loans(LoanQuery::for_client(client.id))
            .await?
            .into_iter()
            .filter(|loan| loan.status.is_open())
            .count();
        if open > 0 {
            warn!(open_loans = open, "loan refused, client has an open loan");
            return Err(ClientError::ineligible(
                client.full_name(),
                "Client has active loans. Must complete existing loans first.",
            )
            .into());
        }

        let plan = self.repos.plans.get_plan(request.interest_plan_id).await?;
        let item = match (plan.item_type, request.item_id) {
            (ItemType::Item, Some(item_id)) => Some(self.repos.items.get_item(item_id).await?),
            _ => None,
        };

        let year = now.year();
        let sequence = self.repos.loans.next_loan_sequence(year).await?;
        let loan = Loan::originate(LoanApplication {
            loan_number: document_number(LOAN_NUMBER_PREFIX, year, sequence),
            client_id: client.id,
            plan: &plan,
            item: item.as_ref(),
            principal: request.principal,
            deposit_percentage: request.deposit_percentage.unwrap_or(Decimal::ZERO),
            duration: request.duration,
            start_date: now,
            created_by: request.created_by,
        })?;

        self.repos.loans.save_loan(&loan).await?;
        info!(
            loan_id = %loan.id,
            loan_number = %loan.loan_number,
            total = %loan.total_amount,
            installment = %loan.installment_amount,
            "loan created"
        );
        Ok(loan)
    }

    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn approve_loan(&self, loan_id: LoanId, approved_by: UserId) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        loan.approve(approved_by, self.now())?;
        self.repos.loans.save_loan(&loan).await?;
        info!(loan_number = %loan.loan_number, "loan approved");
        Ok(loan)
    }

    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn reject_loan(&self, loan_id: LoanId, rejected_by: UserId, reason: &str) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        loan.reject(rejected_by, reason, self.now())?;
        self.repos.loans.save_loan(&loan).await?;
        info!(loan_number = %loan.loan_number, "loan rejected");
        Ok(loan)
    }

    /// Pays out an approved loan
    ///
    /// The disbursement posts to the funds ledger before the loan is saved,
    /// so insufficient company funds leave the loan approved. If the loan
    /// then fails to save, the principal is paid back into the funds. Client
    /// counters and item stock follow best-effort.
    #[instrument(skip(self, request), fields(loan_id = %loan_id, method = ?request.method))]
    pub async fn disburse_loan(&self, loan_id: LoanId, request: DisburseRequest) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let now = self.now();

        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        let details = DisbursementDetails::new(
            request.method,
            request.transaction_id,
            request.disbursed_at.unwrap_or(now),
            request.disbursed_by,
        )?;
        loan.disburse(details)?;

        self.post_funds(
            PostingRequest::new(FundsEntryType::LoanDisbursement, loan.principal, request.disbursed_by, now)
                .with_description(disbursement_description(&loan.loan_number))
                .with_loan(loan.id),
        )
        .await?;
        if let Err(e) = self.repos.loans.save_loan(&loan).await {
            let e = ServiceError::from(e);
            warn!(loan_number = %loan.loan_number, error = %e, "loan not saved, returning disbursement");
            self.post_funds_best_effort(
                PostingRequest::new(FundsEntryType::Replenishment, loan.principal, request.disbursed_by, now)
                    .with_description(disbursement_rollback_description(&loan.loan_number))
                    .with_loan(loan.id),
                ReconciliationRecord::new(ReconciliationOperation::DisbursementRollback, now)
                    .for_loan(loan.id)
                    .for_client(loan.client_id),
            )
            .await;
            return Err(e);
        }
        info!(loan_number = %loan.loan_number, principal = %loan.principal, "loan disbursed");

        self.record_client_disbursement(&loan, now).await;
        if let Some(item_id) = loan.item_id {
            self.take_item_stock(&loan, item_id, now).await;
        }
        Ok(loan)
    }

    async fn record_client_disbursement(&self, loan: &Loan, now: DateTime<Utc>) {
        let result = self
            .update_client(loan.client_id, |client| {
                client.record_disbursement(now);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            let record = ReconciliationRecord::new(ReconciliationOperation::DisbursementCounters, now)
                .for_loan(loan.id)
                .for_client(loan.client_id);
            self.reconcile(record, &e).await;
        }
    }

    async fn take_item_stock(&self, loan: &Loan, item_id: ItemId, now: DateTime<Utc>) {
        let result: Result<(), ServiceError> = async {
            let mut item = self.repos.items.get_item(item_id).await?;
            item.take_one(now)?;
            self.repos.items.save_item(&item).await?;
            info!(item_id = %item_id, stock = item.stock, "item stock decremented");
            Ok(())
        }
        .await;
        if let Err(e) = result {
            let record = ReconciliationRecord::new(ReconciliationOperation::ItemStock, now)
                .for_loan(loan.id)
                .for_item(item_id);
            self.reconcile(record, &e).await;
        }
    }

    /// Collects the upfront deposit
    ///
    /// The deposit counts toward `amount_paid` and is posted to the funds
    /// ledger as a repayment, best-effort. A deposit that clears a disbursed
    /// loan completes it like a final repayment.
    #[instrument(skip(self), fields(loan_id = %loan_id, amount = %amount))]
    pub async fn pay_deposit(&self, loan_id: LoanId, amount: Money, received_by: UserId) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let now = self.now();

        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        let client = self.repos.clients.get_client(loan.client_id).await?;
        let outcome = loan
            .pay_deposit(amount, &client.full_name(), received_by, now)
            .map_err(|e| {
                warn!(error = %e, "deposit rejected");
                e
            })?;
        self.repos.loans.save_loan(&loan).await?;
        info!(
            loan_number = %loan.loan_number,
            remaining = %loan.remaining_balance,
            status = %outcome.status,
            "deposit paid"
        );

        if outcome.completed {
            self.record_completion(&loan, &outcome, now).await;
        }

        self.post_funds_best_effort(
            PostingRequest::new(FundsEntryType::LoanRepayment, amount, received_by, now)
                .with_description(format!("Loan deposit for {}", loan.loan_number))
                .with_loan(loan.id),
            ReconciliationRecord::new(ReconciliationOperation::RepaymentPosting, now)
                .for_loan(loan.id)
                .for_client(loan.client_id),
        )
        .await;
        Ok(loan)
    }

    /// Moves a disbursed loan to `defaulted`
    #[instrument(skip(self), fields(loan_id = %loan_id))]
    pub async fn mark_defaulted(&self, loan_id: LoanId) -> Result<Loan, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Loan(loan_id)).await;
        let now = self.now();

        let mut loan = self.repos.loans.get_loan(loan_id).await?;
        loan.mark_defaulted(now)?;
        self.repos.loans.save_loan(&loan).await?;
        warn!(loan_number = %loan.loan_number, remaining = %loan.remaining_balance, "loan defaulted");

        let result = self
            .update_client(loan.client_id, |client| {
                client.record_default(now);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            let record = ReconciliationRecord::new(ReconciliationOperation::DefaultCounters, now)
                .for_loan(loan.id)
                .for_client(loan.client_id);
            self.reconcile(record, &e).await;
        }
        Ok(loan)
    }

    /// Disbursed loans still open past their due date, earliest due first
    pub async fn overdue_loans(&self) -> Result<Vec<Loan>, ServiceError> {
        let now = self.now();
        let mut loans: Vec<Loan> = self
            .repos
            .loans
            .find_loans(LoanQuery::default().with_statuses([LoanStatus::Active, LoanStatus::AtRisk]))
            .await?
            .into_iter()
            .filter(|loan| loan.is_overdue(now))
            .collect();
        loans.sort_by_key(|loan| loan.due_date);
        Ok(loans)
    }
}
