//! Client onboarding, eligibility and credit scoring

use tracing::{info, instrument, warn};

use core_kernel::{ClientId, UserId};
use domain_client::{Client, ClientError, ClientPerformance, EligibilityReport, NewClient, ScoreBreakdown};
use domain_lending::{Loan, LoanQuery, Payment, PaymentQuery};

use crate::error::ServiceError;
use crate::locks::AggregateKey;
use crate::service::LendingCore;

impl LendingCore {
    /// Registers a client; national ids and phone numbers are unique
    #[instrument(skip(self, request))]
    pub async fn register_client(&self, request: NewClient, created_by: UserId) -> Result<Client, ServiceError> {
        if self
            .repos
            .clients
            .find_by_national_id(request.national_id.trim())
            .await?
            .is_some()
        {
            return Err(ClientError::validation("A client with this national ID already exists").into());
        }
        let client = Client::register(request, created_by, self.now())?;
        self.repos.clients.save_client(&client).await?;
        info!(client_id = %client.id, "client registered");
        Ok(client)
    }

    /// Deletes a client that never borrowed
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: ClientId) -> Result<(), ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Client(client_id)).await;
        let client = self.repos.clients.get_client(client_id).await?;
        let has_loans = !self.client_loans(client_id).await?.is_empty();
        if !client.can_be_deleted(has_loans) {
            return Err(ClientError::validation("Clients with loan history cannot be deleted").into());
        }
        self.repos.clients.delete_client(client_id).await?;
        info!("client deleted");
        Ok(())
    }

    /// Reads, changes and saves a client under its lock
    pub(crate) async fn update_client<F>(&self, client_id: ClientId, change: F) -> Result<Client, ServiceError>
    where
        F: FnOnce(&mut Client) -> Result<(), ServiceError>,
    {
        let _guard = self.locks.lock(AggregateKey::Client(client_id)).await;
        let mut client = self.repos.clients.get_client(client_id).await?;
        change(&mut client)?;
        self.repos.clients.save_client(&client).await?;
        Ok(client)
    }

    pub(crate) async fn client_loans(&self, client_id: ClientId) -> Result<Vec<Loan>, ServiceError> {
        Ok(self.repos.loans.find_loans(LoanQuery::for_client(client_id)).await?)
    }

    pub(crate) async fn client_payments(&self, client_id: ClientId) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.repos.payments.find_payments(PaymentQuery::for_client(client_id)).await?)
    }

    /// Recomputes the score from the full history and stores it
    ///
    /// The result depends only on the history and the clock, never on the
    /// previous score.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn recompute_credit_score(&self, client_id: ClientId) -> Result<u8, ServiceError> {
        let loans = self.client_loans(client_id).await?;
        let payments = self.client_payments(client_id).await?;
        let now = self.now();
        let score = self.scorer.score(&loans, &payments, now);

        let mut previous = 0;
        self.update_client(client_id, |client| {
            previous = client.set_credit_score(i64::from(score), now)?;
            Ok(())
        })
        .await?;
        info!(previous, score, "credit score recomputed");
        Ok(score)
    }

    /// Component scores behind the current recomputation
    pub async fn credit_score_breakdown(&self, client_id: ClientId) -> Result<ScoreBreakdown, ServiceError> {
        self.repos.clients.get_client(client_id).await?;
        let loans = self.client_loans(client_id).await?;
        let payments = self.client_payments(client_id).await?;
        Ok(self.scorer.breakdown(&loans, &payments, self.now()))
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn check_eligibility(&self, client_id: ClientId) -> Result<EligibilityReport, ServiceError> {
        let client = self.repos.clients.get_client(client_id).await?;
        let loans = self.client_loans(client_id).await?;
        let report = EligibilityReport::assess(&client, &loans, self.now());
        if !report.can_take_loan {
            info!(reasons = ?report.reasons, "client not eligible for a new loan");
        }
        Ok(report)
    }

    /// Blacklists (with a reason) or reinstates a client
    #[instrument(skip(self, reason), fields(client_id = %client_id))]
    pub async fn set_eligibility(
        &self,
        client_id: ClientId,
        eligible: bool,
        reason: Option<&str>,
    ) -> Result<Client, ServiceError> {
        let now = self.now();
        let client = self
            .update_client(client_id, |client| Ok(client.set_eligibility(eligible, reason, now)?))
            .await?;
        if eligible {
            info!("client reinstated");
        } else {
            warn!(reason = ?client.blacklist_reason, "client blacklisted");
        }
        Ok(client)
    }

    /// Flips the blacklist flag
    #[instrument(skip(self, reason), fields(client_id = %client_id))]
    pub async fn toggle_eligibility(&self, client_id: ClientId, reason: Option<&str>) -> Result<Client, ServiceError> {
        let now = self.now();
        let client = self
            .update_client(client_id, |client| Ok(client.toggle_eligibility(reason, now)?))
            .await?;
        info!(is_eligible = client.is_eligible, "client eligibility toggled");
        Ok(client)
    }

    /// Manual score override, 0 to 100
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn update_credit_score(&self, client_id: ClientId, score: i64) -> Result<Client, ServiceError> {
        let now = self.now();
        let client = self
            .update_client(client_id, |client| {
                client.set_credit_score(score, now)?;
                Ok(())
            })
            .await?;
        info!(score = client.credit_score, "credit score set manually");
        Ok(client)
    }

    pub async fn client_performance(&self, client_id: ClientId) -> Result<ClientPerformance, ServiceError> {
        self.repos.clients.get_client(client_id).await?;
        let loans = self.client_loans(client_id).await?;
        let payments = self.client_payments(client_id).await?;
        Ok(ClientPerformance::analyse(self.currency, &loans, &payments)?)
    }
}
