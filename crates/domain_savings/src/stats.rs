//! Read-only aggregates over savings accounts

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{ClientId, Currency, Money, MoneyError, SavingsAccountId, Timezone};

use crate::account::SavingsAccount;
use crate::transaction::SavingsTransactionType;

/// Accounts listed in [`SavingsStats::top_accounts`]
pub const TOP_ACCOUNTS: usize = 10;

/// Count and sum of a group of savings movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsBucket {
    pub count: usize,
    pub amount: Money,
}

impl SavingsBucket {
    fn empty(currency: Currency) -> Self {
        Self {
            count: 0,
            amount: Money::zero(currency),
        }
    }

    fn add(&mut self, amount: &Money) -> Result<(), MoneyError> {
        self.count += 1;
        self.amount = self.amount.checked_add(amount)?;
        Ok(())
    }
}

/// One of the largest active balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSavingsAccount {
    pub account_id: SavingsAccountId,
    pub client_id: ClientId,
    pub savings_number: String,
    pub current_balance: Money,
    pub interest_rate: Decimal,
    pub total_deposits: Money,
    pub total_withdrawals: Money,
}

/// Savings book totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsStats {
    pub total_accounts: usize,
    pub active_accounts: usize,
    pub total_balance: Money,
    pub total_deposits: Money,
    pub total_withdrawals: Money,
    pub average_balance: Money,
    pub by_type: BTreeMap<SavingsTransactionType, SavingsBucket>,
    /// Deposits of the current business year keyed by month (1 = January)
    pub monthly_deposits: BTreeMap<u32, SavingsBucket>,
    /// Active accounts by descending balance
    pub top_accounts: Vec<TopSavingsAccount>,
}

impl SavingsStats {
    /// Summarises `accounts` as of `now`
    ///
    /// Account totals cover inactive accounts too; the ranking only lists
    /// active ones.
    pub fn from_accounts(
        currency: Currency,
        accounts: &[SavingsAccount],
        timezone: &Timezone,
        now: DateTime<Utc>,
    ) -> Result<Self, MoneyError> {
        let total_balance = Money::sum(currency, accounts.iter().map(|a| &a.current_balance))?;
        let total_deposits = Money::sum(currency, accounts.iter().map(|a| &a.total_deposits))?;
        let total_withdrawals = Money::sum(currency, accounts.iter().map(|a| &a.total_withdrawals))?;
        let average_balance = if accounts.is_empty() {
            Money::zero(currency)
        } else {
            total_balance
                .divide(Decimal::from(accounts.len()))?
                .round_to_currency()
        };

        let year = timezone.to_local(now).year();
        let mut by_type = BTreeMap::new();
        let mut monthly_deposits = BTreeMap::new();
        for transaction in accounts.iter().flat_map(|a| &a.transactions) {
            by_type
                .entry(transaction.transaction_type)
                .or_insert_with(|| SavingsBucket::empty(currency))
                .add(&transaction.amount)?;

            let local = timezone.to_local(transaction.created_at);
            if transaction.transaction_type == SavingsTransactionType::Deposit && local.year() == year {
                monthly_deposits
                    .entry(local.month())
                    .or_insert_with(|| SavingsBucket::empty(currency))
                    .add(&transaction.amount)?;
            }
        }

        let mut active: Vec<&SavingsAccount> = accounts.iter().filter(|a| a.is_active).collect();
        active.sort_by(|a, b| b.current_balance.amount().cmp(&a.current_balance.amount()));
        let top_accounts = active
            .iter()
            .take(TOP_ACCOUNTS)
            .map(|a| TopSavingsAccount {
                account_id: a.id,
                client_id: a.client_id,
                savings_number: a.savings_number.clone(),
                current_balance: a.current_balance,
                interest_rate: a.interest_rate,
                total_deposits: a.total_deposits,
                total_withdrawals: a.total_withdrawals,
            })
            .collect();

        Ok(Self {
            total_accounts: accounts.len(),
            active_accounts: active.len(),
            total_balance,
            total_deposits,
            total_withdrawals,
            average_balance,
            by_type,
            monthly_deposits,
            top_accounts,
        })
    }

    pub fn bucket(&self, kind: SavingsTransactionType) -> Option<&SavingsBucket> {
        self.by_type.get(&kind)
    }
}
