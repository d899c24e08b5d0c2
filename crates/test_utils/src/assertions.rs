//! Custom Test Assertions
//!
//! Assertion helpers for the ledger and loan invariants, with failure
//! messages that show the offending values.

use core_kernel::Money;
use domain_funds::CompanyFunds;
use domain_lending::Loan;
use domain_savings::SavingsAccount;
use rust_decimal::Decimal;

/// Asserts that two Money values are equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies differ or the amounts differ by more than
/// `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts `remaining_balance == total_amount - amount_paid`
pub fn assert_loan_balanced(loan: &Loan) {
    assert!(
        loan.balance_is_consistent(),
        "Loan {} out of balance: total={}, paid={}, remaining={}",
        loan.loan_number,
        loan.total_amount,
        loan.amount_paid,
        loan.remaining_balance
    );
}

/// Asserts the funds ledger replays to its stored balance and totals
pub fn assert_funds_consistent(funds: &CompanyFunds) {
    if let Err(e) = funds.verify() {
        panic!(
            "Funds ledger inconsistent after {} entries (balance {}): {}",
            funds.history.len(),
            funds.current_balance,
            e
        );
    }
}

/// Asserts the savings balance equals the signed sum of its transactions
/// and is not negative
pub fn assert_savings_consistent(account: &SavingsAccount) {
    let replayed = account
        .ledger_balance()
        .unwrap_or_else(|e| panic!("Savings {} could not be replayed: {}", account.savings_number, e));
    assert_eq!(
        replayed, account.current_balance,
        "Savings {} balance {} does not match its transactions ({})",
        account.savings_number, account.current_balance, replayed
    );
    assert!(
        !account.current_balance.is_negative(),
        "Savings {} has a negative balance {}",
        account.savings_number,
        account.current_balance
    );
}
