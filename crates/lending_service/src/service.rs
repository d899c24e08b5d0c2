//! The lending core facade
//!
//! [`LendingCore`] owns the repository ports, the aggregate lock registry and
//! the clock. Its operations are split by area across the sibling modules;
//! this module holds construction and the helpers they share.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use core_kernel::{Currency, SharedClock, SystemClock, Timezone};
use domain_client::{ClientPort, CreditScorer, MockClientPort};
use domain_funds::{CompanyFunds, FundsLedgerPort, MockFundsLedgerPort, PostingRequest};
use domain_lending::{
    InterestPlanPort, ItemPort, LoanPort, MockInterestPlanPort, MockItemPort, MockLoanPort, MockPaymentPort,
    PaymentPort,
};
use domain_savings::{MockSavingsPort, SavingsPort};
use infra_db::{create_pool, run_migrations, PostgresFundsLedger};

use crate::config::LendingConfig;
use crate::error::ServiceError;
use crate::locks::{AggregateKey, AggregateLocks};
use crate::reconciliation::{InMemoryReconciliationLog, ReconciliationPort, ReconciliationRecord};

/// Persistence adapters, one per aggregate
#[derive(Clone)]
pub struct Repositories {
    pub clients: Arc<dyn ClientPort>,
    pub plans: Arc<dyn InterestPlanPort>,
    pub items: Arc<dyn ItemPort>,
    pub loans: Arc<dyn LoanPort>,
    pub payments: Arc<dyn PaymentPort>,
    pub funds: Arc<dyn FundsLedgerPort>,
    pub savings: Arc<dyn SavingsPort>,
    pub reconciliation: Arc<dyn ReconciliationPort>,
}

impl Repositories {
    /// Every aggregate in process memory
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(MockClientPort::new()),
            plans: Arc::new(MockInterestPlanPort::new()),
            items: Arc::new(MockItemPort::new()),
            loans: Arc::new(MockLoanPort::new()),
            payments: Arc::new(MockPaymentPort::new()),
            funds: Arc::new(MockFundsLedgerPort::new()),
            savings: Arc::new(MockSavingsPort::new()),
            reconciliation: Arc::new(InMemoryReconciliationLog::new()),
        }
    }

    pub fn with_funds_ledger(mut self, funds: Arc<dyn FundsLedgerPort>) -> Self {
        self.funds = funds;
        self
    }
}

/// Application services over the lending aggregates
#[derive(Clone)]
pub struct LendingCore {
    pub(crate) repos: Repositories,
    pub(crate) locks: AggregateLocks,
    pub(crate) clock: SharedClock,
    pub(crate) scorer: CreditScorer,
    pub(crate) currency: Currency,
    pub(crate) timezone: Timezone,
}

impl LendingCore {
    pub fn new(repos: Repositories, config: &LendingConfig, clock: SharedClock) -> Self {
        Self {
            repos,
            locks: AggregateLocks::new(),
            clock,
            scorer: CreditScorer::new(config.scoring.clone()),
            currency: config.currency,
            timezone: config.business_timezone,
        }
    }

    /// In-memory adapters on the system clock
    pub fn in_memory(config: &LendingConfig) -> Self {
        Self::new(Repositories::in_memory(), config, Arc::new(SystemClock))
    }

    /// Uses PostgreSQL for the funds ledger when a database is configured
    ///
    /// Migrations are applied on connect.
    pub async fn from_config(config: &LendingConfig) -> Result<Self, ServiceError> {
        let mut repos = Repositories::in_memory();
        match config.database() {
            Some(database) => {
                let pool = create_pool(&database).await?;
                run_migrations(&pool).await?;
                repos = repos.with_funds_ledger(Arc::new(PostgresFundsLedger::new(pool)));
                info!(currency = %config.currency, "funds ledger on postgres");
            }
            None => {
                warn!("no database configured, all aggregates are in memory");
            }
        }
        Ok(Self::new(repos, config, Arc::new(SystemClock)))
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    pub fn locks(&self) -> &AggregateLocks {
        &self.locks
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Posts one entry under the funds lock
    ///
    /// The entry is validated against the current balance before the append,
    /// so a rejected posting leaves the ledger untouched.
    pub(crate) async fn post_funds(&self, request: PostingRequest) -> Result<CompanyFunds, ServiceError> {
        let _guard = self.locks.lock(AggregateKey::Funds).await;

        let mut funds = self.repos.funds.load_funds(self.currency).await?;
        let entry = funds.prepare(request).map_err(|e| {
            warn!(error = %e, "ledger posting rejected");
            e
        })?;
        self.repos.funds.append_entry(&entry).await?;
        info!(
            entry_type = %entry.entry_type,
            amount = %entry.amount,
            new_balance = %entry.new_balance,
            "funds ledger entry posted"
        );
        funds.apply(entry)?;
        Ok(funds)
    }

    /// Posts an entry after the primary change has committed
    ///
    /// A failure is logged and recorded for reconciliation instead of
    /// being returned.
    pub(crate) async fn post_funds_best_effort(&self, request: PostingRequest, record: ReconciliationRecord) {
        let amount = request.amount;
        if let Err(e) = self.post_funds(request).await {
            self.reconcile(record.with_amount(amount), &e).await;
        }
    }

    /// Logs a failed side effect and stores its reconciliation record
    pub(crate) async fn reconcile(&self, mut record: ReconciliationRecord, cause: &ServiceError) {
        record.error = cause.to_string();
        error!(
            operation = %record.operation,
            loan_id = ?record.loan_id,
            payment_id = ?record.payment_id,
            client_id = ?record.client_id,
            error = %cause,
            "side effect failed, recorded for reconciliation"
        );
        if let Err(e) = self.repos.reconciliation.record(&record).await {
            error!(record_id = %record.id, error = %e, "could not store reconciliation record");
        }
    }
}
