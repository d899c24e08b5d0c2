//! PostgreSQL company funds ledger
//!
//! `company_funds` holds the materialized running totals per currency and
//! `company_funds_ledger` the append-only entries. An append locks the totals
//! row with `SELECT ... FOR UPDATE`, checks the entry was prepared against the
//! locked balance, inserts the entry and moves the totals, all in one
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, Currency, DomainPort, HealthCheckResult, HealthCheckable, LedgerEntryId, LoanId, Money,
    PaymentId, PortError, UserId,
};
use domain_funds::{CompanyFunds, FundsEntryType, FundsLedgerPort, LedgerEntry};

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
struct TotalsRow {
    current_balance: Decimal,
    total_disbursed: Decimal,
    total_recovered: Decimal,
    total_profit: Decimal,
    total_expenses: Decimal,
}

#[derive(Debug, Clone, FromRow)]
struct LedgerRow {
    entry_id: Uuid,
    entry_type: String,
    amount: Decimal,
    previous_balance: Decimal,
    new_balance: Decimal,
    description: String,
    loan_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    processed_by: Uuid,
    transaction_date: DateTime<Utc>,
}

impl LedgerRow {
    fn into_entry(self, currency: Currency) -> Result<LedgerEntry, DatabaseError> {
        let entry_type: FundsEntryType = self
            .entry_type
            .parse()
            .map_err(|_| DatabaseError::corrupt(format!("unknown entry type '{}'", self.entry_type)))?;
        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(self.entry_id),
            entry_type,
            amount: Money::new(self.amount, currency),
            previous_balance: Money::new(self.previous_balance, currency),
            new_balance: Money::new(self.new_balance, currency),
            description: self.description,
            loan_id: self.loan_id.map(LoanId::from_uuid),
            payment_id: self.payment_id.map(PaymentId::from_uuid),
            processed_by: UserId::from_uuid(self.processed_by),
            transaction_date: self.transaction_date,
        })
    }
}

/// Checks the replayed aggregate against the stored totals row
fn check_totals(funds: &CompanyFunds, totals: &TotalsRow) -> Result<(), DatabaseError> {
    let pairs = [
        ("current_balance", funds.current_balance.amount(), totals.current_balance),
        ("total_disbursed", funds.total_disbursed.amount(), totals.total_disbursed),
        ("total_recovered", funds.total_recovered.amount(), totals.total_recovered),
        ("total_profit", funds.total_profit.amount(), totals.total_profit),
        ("total_expenses", funds.total_expenses.amount(), totals.total_expenses),
    ];
    for (column, replayed, stored) in pairs {
        if replayed != stored {
            return Err(DatabaseError::corrupt(format!(
                "{} is {} but the ledger gives {}",
                column, stored, replayed
            )));
        }
    }
    Ok(())
}

/// `FundsLedgerPort` on PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresFundsLedger {
    pool: PgPool,
}

impl PostgresFundsLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, currency: Currency) -> Result<CompanyFunds, DatabaseError> {
        let code = currency.code();
        let totals = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT current_balance, total_disbursed, total_recovered, total_profit, total_expenses
            FROM company_funds
            WHERE currency = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        let Some(totals) = totals else {
            debug!(currency = code, "no funds row yet");
            return Ok(CompanyFunds::new(currency));
        };

        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT entry_id, entry_type, amount, previous_balance, new_balance, description,
                   loan_id, payment_id, processed_by, transaction_date
            FROM company_funds_ledger
            WHERE currency = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| row.into_entry(currency))
            .collect::<Result<Vec<_>, _>>()?;
        let funds = CompanyFunds::replay(currency, entries).map_err(|e| DatabaseError::corrupt(e.to_string()))?;
        check_totals(&funds, &totals)?;
        debug!(currency = code, entries = funds.history.len(), "funds ledger loaded");
        Ok(funds)
    }

    async fn append(&self, entry: &LedgerEntry) -> Result<(), DatabaseError> {
        let currency = entry.amount.currency().code();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO company_funds (currency) VALUES ($1) ON CONFLICT (currency) DO NOTHING")
            .bind(currency)
            .execute(&mut *tx)
            .await?;

        let balance: Decimal =
            sqlx::query_scalar("SELECT current_balance FROM company_funds WHERE currency = $1 FOR UPDATE")
                .bind(currency)
                .fetch_one(&mut *tx)
                .await?;

        if balance != entry.previous_balance.amount() {
            warn!(
                entry_id = %entry.id,
                stored = %balance,
                prepared = %entry.previous_balance.amount(),
                "rejecting stale ledger entry"
            );
            return Err(DatabaseError::Conflict(format!(
                "funds balance is {} but entry {} was prepared against {}",
                balance,
                entry.id,
                entry.previous_balance.amount()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO company_funds_ledger (
                entry_id, currency, entry_type, amount, previous_balance, new_balance,
                description, loan_id, payment_id, processed_by, transaction_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*entry.id.as_uuid())
        .bind(currency)
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.amount())
        .bind(entry.previous_balance.amount())
        .bind(entry.new_balance.amount())
        .bind(&entry.description)
        .bind(entry.loan_id.map(Uuid::from))
        .bind(entry.payment_id.map(Uuid::from))
        .bind(*entry.processed_by.as_uuid())
        .bind(entry.transaction_date)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE company_funds SET
                current_balance = $2,
                total_disbursed = total_disbursed + CASE WHEN $3 = 'loan-disbursement' THEN $4 ELSE 0 END,
                total_recovered = total_recovered + CASE WHEN $3 = 'loan-repayment' THEN $4 ELSE 0 END,
                total_profit    = total_profit    + CASE WHEN $3 = 'profit' THEN $4 ELSE 0 END,
                total_expenses  = total_expenses  + CASE WHEN $3 = 'expense' THEN $4 ELSE 0 END,
                entry_count     = entry_count + 1,
                updated_at      = $5
            WHERE currency = $1
            "#,
        )
        .bind(currency)
        .bind(entry.new_balance.amount())
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.amount())
        .bind(entry.transaction_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

impl DomainPort for PostgresFundsLedger {}

#[async_trait]
impl HealthCheckable for PostgresFundsLedger {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: "postgres-funds-ledger".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl FundsLedgerPort for PostgresFundsLedger {
    #[instrument(skip(self), fields(currency = %currency))]
    async fn load_funds(&self, currency: Currency) -> Result<CompanyFunds, PortError> {
        Ok(self.fetch(currency).await?)
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id, entry_type = %entry.entry_type))]
    async fn append_entry(&self, entry: &LedgerEntry) -> Result<(), PortError> {
        self.append(entry).await?;
        info!(new_balance = %entry.new_balance, "ledger entry appended");
        Ok(())
    }
}
