//! Integration tests for domain_funds

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, LoanId, Money, PaymentId, TimeRange, Timezone, UserId};
use domain_funds::{
    reversal_description, CompanyFunds, FundsEntryType, FundsError, PostingRequest, TransactionFilter,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 7, 30, 0).unwrap()
}

fn kes(units: i64) -> Money {
    Money::from_major(units, Currency::KES)
}

fn funded(units: i64) -> CompanyFunds {
    let mut funds = CompanyFunds::new(Currency::KES);
    funds.initialize(kes(units), UserId::new(), start()).unwrap();
    funds
}

// ============================================================================
// Posting Tests
// ============================================================================

mod posting_tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_for_disbursement() {
        let mut funds = funded(500);

        let err = funds
            .record_disbursement(kes(600), LoanId::new(), "LN-2025-000007", UserId::new(), start())
            .unwrap_err();

        assert!(err.to_string().starts_with("Insufficient company funds for this transaction"));
        assert_eq!(funds.current_balance, kes(500));
        assert_eq!(funds.history.len(), 1);
        assert_eq!(funds.total_disbursed, Money::zero(Currency::KES));
    }

    #[test]
    fn test_disbursing_entire_balance_is_allowed() {
        let mut funds = funded(500);
        funds
            .record_disbursement(kes(500), LoanId::new(), "LN-2025-000007", UserId::new(), start())
            .unwrap();
        assert!(funds.current_balance.is_zero());
    }

    #[test]
    fn test_expense_cannot_overdraw() {
        let mut funds = funded(100);
        let result = funds.record_expense(kes(101), "Generator repair", UserId::new(), start());
        assert!(matches!(result, Err(FundsError::InsufficientFunds { .. })));
    }

    #[test]
    fn test_initial_only_on_empty_ledger() {
        let mut funds = CompanyFunds::new(Currency::KES);
        funds.replenish(kes(1000), None, UserId::new(), start()).unwrap();

        let result = funds.initialize(kes(1000), UserId::new(), start());
        assert!(matches!(result, Err(FundsError::AlreadyInitialized)));
    }

    #[test]
    fn test_entry_chain_links_balances() {
        let mut funds = funded(3000);
        let loan = LoanId::new();
        funds.record_disbursement(kes(1000), loan, "LN-2025-000001", UserId::new(), start()).unwrap();
        funds
            .record_repayment(kes(1100), loan, "LN-2025-000001", Some(PaymentId::new()), UserId::new(), start())
            .unwrap();

        for pair in funds.history.windows(2) {
            assert_eq!(pair[0].new_balance, pair[1].previous_balance);
        }
        assert_eq!(funds.last_entry().unwrap().new_balance, funds.current_balance);
        assert_eq!(funds.current_balance, kes(3100));
    }

    #[test]
    fn test_reversal_posted_as_described_expense() {
        let mut funds = funded(3000);
        let entry = funds
            .post(
                PostingRequest::new(FundsEntryType::Expense, kes(250), UserId::new(), start())
                    .with_description(reversal_description("PMT-2025-000042"))
                    .with_payment(PaymentId::new()),
            )
            .unwrap();

        assert_eq!(entry.description, "Reversal of payment PMT-2025-000042");
        assert!(entry.payment_id.is_some());
        assert_eq!(funds.total_expenses, kes(250));
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut funds = funded(1000);
        let usd = Money::from_major(10, Currency::USD);
        let result = funds.replenish(usd, None, UserId::new(), start());
        assert!(matches!(result, Err(FundsError::Money(_))));
    }
}

// ============================================================================
// Report Tests
// ============================================================================

mod report_tests {
    use super::*;

    fn busy_ledger() -> CompanyFunds {
        let mut funds = funded(50_000);
        let by = UserId::new();
        for day in 0..6 {
            let at = start() + Duration::days(day * 10);
            let loan = LoanId::new();
            funds.record_disbursement(kes(4000), loan, "LN-2025-000100", by, at).unwrap();
            funds.record_repayment(kes(4400), loan, "LN-2025-000100", None, by, at + Duration::days(5)).unwrap();
        }
        funds.record_profit(kes(1000), Some("Quarter close"), by, start() + Duration::days(70)).unwrap();
        funds
    }

    #[test]
    fn test_roi_from_running_totals() {
        let summary = busy_ledger().summary().unwrap();
        assert_eq!(summary.total_disbursed, kes(24_000));
        assert_eq!(summary.total_recovered, kes(26_400));
        assert_eq!(summary.return_on_investment, dec!(10));
        assert_eq!(summary.entry_count, 14);
    }

    #[test]
    fn test_months_cover_every_entry() {
        let funds = busy_ledger();
        let months = funds.by_month(Timezone::default()).unwrap();
        let income: Money = months.values().fold(Money::zero(Currency::KES), |acc, m| acc + m.income);
        let summary = funds.summary().unwrap();
        assert_eq!(income, summary.total_income);
    }

    #[test]
    fn test_range_and_listing() {
        let funds = busy_ledger();
        let range = TimeRange::new(Some(start() + Duration::days(20)), Some(start() + Duration::days(30))).unwrap();

        let in_range = funds.in_range(range);
        assert_eq!(in_range.len(), 3);

        let listed = funds.transactions(&TransactionFilter::of_type(FundsEntryType::LoanDisbursement).within(range));
        assert_eq!(listed.len(), 2);
        assert!(listed[0].transaction_date > listed[1].transaction_date);
    }

    #[test]
    fn test_verify_after_many_postings() {
        busy_ledger().verify().unwrap();
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn entry_type() -> impl Strategy<Value = FundsEntryType> {
        prop_oneof![
            Just(FundsEntryType::Replenishment),
            Just(FundsEntryType::LoanDisbursement),
            Just(FundsEntryType::LoanRepayment),
            Just(FundsEntryType::Expense),
            Just(FundsEntryType::Profit),
        ]
    }

    proptest! {
        #[test]
        fn balance_equals_signed_sum(
            initial in 0i64..20_000i64,
            postings in proptest::collection::vec((entry_type(), 1i64..10_000i64), 0..40),
        ) {
            let mut funds = CompanyFunds::new(Currency::KES);
            if initial > 0 {
                funds.initialize(kes(initial), UserId::new(), start()).unwrap();
            }

            for (entry_type, amount) in postings {
                let before = funds.clone();
                let request = PostingRequest::new(entry_type, kes(amount), UserId::new(), start())
                    .with_description("generated");
                if funds.post(request).is_err() {
                    prop_assert_eq!(&funds, &before);
                }
                prop_assert!(!funds.current_balance.is_negative());
            }

            let signed = funds
                .history
                .iter()
                .fold(Money::zero(Currency::KES), |acc, e| acc + e.signed_amount());
            prop_assert_eq!(funds.current_balance, signed);
            prop_assert!(funds.verify().is_ok());
        }
    }
}
