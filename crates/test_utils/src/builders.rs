//! Test Data Builders
//!
//! Builders for test data with sensible defaults. Tests set only the
//! fields they care about; identities are randomised with `fake` so that
//! uniqueness checks never collide between clients in one test.

use chrono::{DateTime, Utc};
use fake::faker::address::en::{CityName, StateName, StreetName};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{ClientId, Money, UserId};
use domain_client::{Address, EmergencyContact, NewClient, Relationship};
use domain_lending::{
    DisbursementDetails, DisbursementMethod, InterestPlan, Item, Loan, LoanApplication, LoanStatus,
};

use crate::fixtures::{MoneyFixtures, PlanFixtures, TemporalFixtures};

/// Kenyan-style mobile number, always 13 characters
fn phone_number() -> String {
    format!("+2547{}", (10_000_000u32..99_999_999).fake::<u32>())
}

fn national_id() -> String {
    (10_000_000u32..99_999_999).fake::<u32>().to_string()
}

fn address() -> Address {
    Address {
        county: StateName().fake(),
        sub_location: CityName().fake(),
        location: CityName().fake(),
        street: Some(StreetName().fake()),
    }
}

/// Builder for client registration requests
pub struct NewClientBuilder {
    request: NewClient,
}

impl Default for NewClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewClientBuilder {
    /// A valid registration with random identity fields
    pub fn new() -> Self {
        Self {
            request: NewClient {
                first_name: FirstName().fake(),
                middle_name: None,
                last_name: LastName().fake(),
                phone_number: phone_number(),
                national_id: national_id(),
                address: address(),
                emergency_contact: EmergencyContact {
                    full_name: Name().fake(),
                    phone_number: phone_number(),
                    relationship: Relationship::Sister,
                    national_id: national_id(),
                    address: address(),
                },
            },
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.request.first_name = first.into();
        self.request.last_name = last.into();
        self
    }

    pub fn with_national_id(mut self, national_id: impl Into<String>) -> Self {
        self.request.national_id = national_id.into();
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.request.phone_number = phone_number.into();
        self
    }

    pub fn build(self) -> NewClient {
        self.request
    }
}

/// Builder for loans at a chosen lifecycle stage
///
/// Defaults to a 1,000 KES, 30-day loan on the daily 10% plan, which gives
/// a total of 1,100 and an installment of 37.
pub struct LoanBuilder {
    client_id: ClientId,
    plan: InterestPlan,
    item: Option<Item>,
    principal: Money,
    deposit_percentage: Decimal,
    duration: u32,
    start_date: DateTime<Utc>,
    officer: UserId,
    status: LoanStatus,
}

impl Default for LoanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self {
            client_id: ClientId::new(),
            plan: PlanFixtures::daily_ten_percent(),
            item: None,
            principal: MoneyFixtures::kes_major(1_000),
            deposit_percentage: Decimal::ZERO,
            duration: 30,
            start_date: TemporalFixtures::business_day(),
            officer: UserId::new(),
            status: LoanStatus::Pending,
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_plan(mut self, plan: InterestPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Finances `item`; the plan must be an item plan
    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_principal(mut self, principal: Money) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_deposit_percentage(mut self, percentage: Decimal) -> Self {
        self.deposit_percentage = percentage;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn starting(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn approved(mut self) -> Self {
        self.status = LoanStatus::Approved;
        self
    }

    /// Approved and disbursed in cash on the start date
    pub fn disbursed(mut self) -> Self {
        self.status = LoanStatus::Active;
        self
    }

    /// Builds the loan, walking it through the state machine to the
    /// requested stage
    ///
    /// # Panics
    ///
    /// Panics if the configured plan, principal or duration are invalid.
    pub fn build(self) -> Loan {
        let mut loan = Loan::originate(LoanApplication {
            loan_number: "LN-2025-000001".to_string(),
            client_id: self.client_id,
            plan: &self.plan,
            item: self.item.as_ref(),
            principal: Some(self.principal),
            deposit_percentage: self.deposit_percentage,
            duration: self.duration,
            start_date: self.start_date,
            created_by: self.officer,
        })
        .expect("loan builder configuration should originate");

        if matches!(self.status, LoanStatus::Approved | LoanStatus::Active) {
            loan.approve(self.officer, self.start_date)
                .expect("pending loan should approve");
        }
        if self.status == LoanStatus::Active {
            let details = DisbursementDetails::new(DisbursementMethod::Cash, None, self.start_date, self.officer)
                .expect("cash disbursement needs no reference");
            loan.disburse(details).expect("approved loan should disburse");
        }
        loan
    }
}
