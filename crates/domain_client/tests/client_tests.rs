//! Integration tests for domain_client

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, Currency, Money, UserId};
use domain_lending::{
    assess_lateness, document_number, DisbursementDetails, DisbursementMethod, InterestPlan, ItemType, Loan,
    LoanApplication, LoanStatus, Payment, PaymentFrequency, PaymentMethod,
};

use domain_client::{
    Address, Client, ClientError, ClientPerformance, CreditScorer, EligibilityReport, EmergencyContact,
    ImprovementTrend, NewClient, PaymentConsistency, Relationship, RiskLevel, ScoringPolicy,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn kes(units: i64) -> Money {
    Money::from_major(units, Currency::KES)
}

fn new_client(phone: &str, national_id: &str) -> NewClient {
    let address = Address {
        county: "Kisumu".into(),
        sub_location: "Milimani".into(),
        location: "Central".into(),
        street: Some("Oginga Odinga Rd".into()),
    };
    NewClient {
        first_name: "Grace".into(),
        middle_name: Some("Akinyi".into()),
        last_name: "Ouma".into(),
        phone_number: phone.into(),
        national_id: national_id.into(),
        address: address.clone(),
        emergency_contact: EmergencyContact {
            full_name: "Tom Ouma".into(),
            phone_number: "0733111222".into(),
            relationship: Relationship::Spouse,
            national_id: "21000111".into(),
            address,
        },
    }
}

fn client() -> Client {
    Client::register(new_client("0711000111", "31000111"), UserId::new(), now()).unwrap()
}

/// A disbursed 10% daily loan created `days_ago`
fn loan(client_id: ClientId, principal: i64, days_ago: i64) -> Loan {
    let plan = InterestPlan::new("Daily", ItemType::Money, PaymentFrequency::Daily, dec!(10), Currency::KES);
    let start = now() - Duration::days(days_ago);
    let mut loan = Loan::originate(LoanApplication {
        loan_number: document_number("LN", 2025, 1),
        client_id,
        plan: &plan,
        item: None,
        principal: Some(kes(principal)),
        deposit_percentage: Decimal::ZERO,
        duration: 30,
        start_date: start,
        created_by: UserId::new(),
    })
    .unwrap();
    loan.approve(UserId::new(), start).unwrap();
    loan.disburse(DisbursementDetails::new(DisbursementMethod::Cash, None, start, UserId::new()).unwrap())
        .unwrap();
    loan
}

fn pay(loan: &mut Loan, amount: i64, paid_at: DateTime<Utc>) -> Payment {
    let lateness = assess_lateness(paid_at, loan.due_date, &loan.installment_amount, loan.penalty_rate);
    let payment = Payment::completed(
        document_number("PMT", 2025, 1),
        loan.id,
        loan.client_id,
        kes(amount),
        PaymentMethod::Cash,
        None,
        paid_at,
        loan.due_date,
        lateness,
        UserId::new(),
    );
    loan.apply_repayment(&payment, "Grace").unwrap();
    payment
}

// ============================================================================
// Credit Scoring Tests
// ============================================================================

mod scoring_tests {
    use super::*;

    #[test]
    fn test_clean_completed_history() {
        let client = client();
        let mut loan = loan(client.id, 1000, 90);
        let start = loan.start_date;
        let payments = vec![
            pay(&mut loan, 500, start + Duration::days(10)),
            pay(&mut loan, 600, start + Duration::days(20)),
        ];
        assert_eq!(loan.status, LoanStatus::Completed);

        let breakdown = CreditScorer::default().breakdown(&[loan], &payments, now());

        assert_eq!(breakdown.payment_history, dec!(100));
        assert_eq!(breakdown.utilization, dec!(100));
        assert_eq!(breakdown.history_length, dec!(56));
        assert_eq!(breakdown.recent_activity, dec!(100));
        // 100 → 100 → 100 → 100 → 95.6 → 96.04
        assert_eq!(breakdown.score, 96);
    }

    #[test]
    fn test_default_with_severe_lateness() {
        let client = client();
        let mut loan = loan(client.id, 1000, 200);
        let paid_at = loan.due_date + Duration::days(40);
        let payments = vec![pay(&mut loan, 100, paid_at)];
        loan.mark_defaulted(now()).unwrap();

        let breakdown = CreditScorer::default().breakdown(&[loan], &payments, now());

        assert_eq!(breakdown.payment_history, Decimal::ZERO);
        assert_eq!(breakdown.defaults, Decimal::ZERO);
        assert_eq!(breakdown.history_length.round_dp(2), dec!(63.33));
        assert_eq!(breakdown.recent_activity, Decimal::ZERO);
        // 60 → 45 → 53.25 → 54.26 → 48.83
        assert_eq!(breakdown.score, 49);
    }

    #[test]
    fn test_history_length_counts_partial_months() {
        let client = client();
        let open = loan(client.id, 1000, 167);

        let breakdown = CreditScorer::default().breakdown(&[open], &[], now());

        // 50 + 2 * 167 / 30
        assert_eq!(breakdown.history_length.round_dp(4), dec!(61.1333));
        // 100 → 100 → 100 → 96.1133 → 96.502
        assert_eq!(breakdown.score, 97);
    }

    #[test]
    fn test_utilization_band() {
        let client = client();
        let open = loan(client.id, 27_273, 10);
        assert_eq!(open.total_amount, kes(30_001));

        let breakdown = CreditScorer::default().breakdown(&[open], &[], now());
        // 30_001 / 60_002 = 0.5
        assert_eq!(breakdown.utilization, dec!(80));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let client = client();
        let mut loan = loan(client.id, 5000, 45);
        let start = loan.start_date;
        let first_payment = pay(&mut loan, 1000, start + Duration::days(5));
        let due_date = loan.due_date;
        let second_payment = pay(&mut loan, 1000, due_date + Duration::days(9));
        let payments = vec![first_payment, second_payment];
        let loans = vec![loan];

        let scorer = CreditScorer::new(ScoringPolicy::default());
        let first = scorer.score(&loans, &payments, now());
        let second = scorer.score(&loans, &payments, now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_policy_changes_idle_score() {
        let policy = ScoringPolicy {
            recent_idle_score: dec!(100),
            history_base_score: dec!(100),
            ..ScoringPolicy::default()
        };
        assert_eq!(CreditScorer::new(policy).score(&[], &[], now()), 100);
    }
}

// ============================================================================
// Eligibility Tests
// ============================================================================

mod eligibility_tests {
    use super::*;

    #[test]
    fn test_fresh_client_can_borrow() {
        let report = EligibilityReport::assess(&client(), &[], now());
        assert!(report.can_take_loan);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn test_all_reasons_reported() {
        let mut client = client();
        client.set_eligibility(false, Some("Forged payslip"), now()).unwrap();
        client.set_credit_score(40, now()).unwrap();

        let open = loan(client.id, 1000, 5);
        let mut defaulted = loan(client.id, 1000, 60);
        defaulted.mark_defaulted(now()).unwrap();

        let report = EligibilityReport::assess(&client, &[open, defaulted], now());

        assert!(!report.can_take_loan);
        assert_eq!(report.open_loans, 1);
        assert_eq!(report.recent_defaults, 1);
        assert_eq!(
            report.reasons,
            vec![
                "Client is blacklisted",
                "Client has active loans",
                "Client has recent defaults",
                "Credit score is too low",
            ]
        );
    }

    #[test]
    fn test_old_default_not_recent() {
        let client = client();
        let mut old = loan(client.id, 1000, 200);
        old.mark_defaulted(now()).unwrap();

        let report = EligibilityReport::assess(&client, &[old], now());
        assert_eq!(report.recent_defaults, 0);
        assert!(report.can_take_loan);
    }
}

// ============================================================================
// Performance Tests
// ============================================================================

mod performance_tests {
    use super::*;

    #[test]
    fn test_regular_on_time_payer() {
        let client = client();
        let mut loan = loan(client.id, 3000, 60);
        let start = loan.start_date;
        let payments: Vec<Payment> = (1..=4)
            .map(|week| pay(&mut loan, 500, start + Duration::weeks(week)))
            .collect();

        let performance = ClientPerformance::analyse(Currency::KES, &[loan], &payments).unwrap();

        assert_eq!(performance.summary.timely_repayment_rate, dec!(100));
        assert_eq!(performance.summary.active_loans, 1);
        assert_eq!(performance.financials.total_repaid, kes(2000));
        assert_eq!(performance.financials.outstanding_balance, kes(1300));
        assert_eq!(performance.financials.estimated_interest_paid, kes(200));
        assert_eq!(performance.trends.payment_consistency, PaymentConsistency::Excellent);
        assert_eq!(performance.trends.risk_level, RiskLevel::VeryLow);
        assert_eq!(performance.trends.improvement, ImprovementTrend::Stable);
    }

    #[test]
    fn test_worsening_lateness() {
        let client = client();
        let mut loan = loan(client.id, 10_000, 100);
        let due = loan.due_date;
        let payments = vec![
            pay(&mut loan, 100, due - Duration::days(20)),
            pay(&mut loan, 100, due - Duration::days(18)),
            pay(&mut loan, 100, due + Duration::days(5)),
            pay(&mut loan, 100, due + Duration::days(15)),
        ];

        let performance = ClientPerformance::analyse(Currency::KES, &[loan], &payments).unwrap();

        assert_eq!(performance.summary.late_payments, 2);
        assert_eq!(performance.summary.average_days_late, dec!(10));
        assert_eq!(performance.summary.timely_repayment_rate, dec!(50));
        assert_eq!(performance.trends.risk_level, RiskLevel::High);
        assert_eq!(performance.trends.improvement, ImprovementTrend::Declining);
        assert_eq!(performance.trends.payment_consistency, PaymentConsistency::Poor);
    }
}

// ============================================================================
// Manual Adjustment Tests
// ============================================================================

mod adjustment_tests {
    use super::*;

    #[test]
    fn test_manual_score_bounds() {
        let mut client = client();
        assert!(matches!(client.set_credit_score(150, now()), Err(ClientError::InvalidCreditScore(150))));
        assert_eq!(client.set_credit_score(75, now()).unwrap(), 100);
        assert_eq!(client.credit_score, 75);
    }

    #[test]
    fn test_completion_adjustment_from_policy() {
        let mut client = client();
        client.set_credit_score(97, now()).unwrap();
        let policy = ScoringPolicy::default();

        client.adjust_credit_score(policy.completion_adjustment(true), now());
        assert_eq!(client.credit_score, 100);

        client.adjust_credit_score(policy.completion_adjustment(false), now());
        assert_eq!(client.credit_score, 98);
    }
}
