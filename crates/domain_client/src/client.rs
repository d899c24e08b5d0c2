//! Client profiles and lending counters
//!
//! A client's identity is validated once at registration. After that the
//! lending services only touch the counters, the credit score and the
//! eligibility flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use validator::Validate;

use core_kernel::{ClientId, UserId};
use crate::error::ClientError;

/// Physical address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, message = "county is required"))]
    pub county: String,
    #[validate(length(min = 1, message = "sub-location is required"))]
    pub sub_location: String,
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    pub street: Option<String>,
}

/// Emergency contact relationship to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relationship {
    Parent,
    Relative,
    Sister,
    Brother,
    Guardian,
    Spouse,
    Other,
}

/// Person to reach when the client cannot be reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmergencyContact {
    #[validate(length(min = 1, message = "full name is required"))]
    pub full_name: String,
    #[validate(length(min = 7, max = 15, message = "phone number must be 7 to 15 characters"))]
    pub phone_number: String,
    pub relationship: Relationship,
    #[validate(length(min = 1, message = "national ID is required"))]
    pub national_id: String,
    #[validate(nested)]
    pub address: Address,
}

/// Registration request for a new client
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewClient {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(length(min = 7, max = 15, message = "phone number must be 7 to 15 characters"))]
    pub phone_number: String,
    #[validate(length(min = 1, max = 20, message = "national ID is required"))]
    pub national_id: String,
    #[validate(nested)]
    pub address: Address,
    #[validate(nested)]
    pub emergency_contact: EmergencyContact,
}

/// Maximum credit score
pub const MAX_CREDIT_SCORE: u8 = 100;

/// A borrower
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Unique across clients
    pub phone_number: String,
    /// Unique across clients
    pub national_id: String,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    /// 0..=100
    pub credit_score: u8,
    pub total_loans_taken: u32,
    pub total_loans_repaid: u32,
    pub total_defaults: u32,
    pub current_active_loans: u32,
    pub is_eligible: bool,
    pub blacklist_reason: Option<String>,
    pub last_loan_date: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Registers a client from a validated request
    ///
    /// Names and identifiers are trimmed. The client starts eligible with a
    /// perfect score and zeroed counters.
    pub fn register(request: NewClient, created_by: UserId, now: DateTime<Utc>) -> Result<Self, ClientError> {
        request
            .validate()
            .map_err(|e| ClientError::from_validation_errors(&e))?;

        Ok(Self {
            id: ClientId::new_v7(),
            first_name: request.first_name.trim().to_string(),
            middle_name: request
                .middle_name
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            last_name: request.last_name.trim().to_string(),
            phone_number: request.phone_number.trim().to_string(),
            national_id: request.national_id.trim().to_string(),
            address: request.address,
            emergency_contact: request.emergency_contact,
            credit_score: MAX_CREDIT_SCORE,
            total_loans_taken: 0,
            total_loans_repaid: 0,
            total_defaults: 0,
            current_active_loans: 0,
            is_eligible: true,
            blacklist_reason: None,
            last_loan_date: None,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// "First Middle Last"
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }

    /// Fails for a blacklisted client
    pub fn ensure_can_borrow(&self) -> Result<(), ClientError> {
        if !self.is_eligible {
            let reason = self
                .blacklist_reason
                .clone()
                .unwrap_or_else(|| "Client is blacklisted".to_string());
            return Err(ClientError::ineligible(self.full_name(), reason));
        }
        Ok(())
    }

    /// Counters after a loan is disbursed
    pub fn record_disbursement(&mut self, now: DateTime<Utc>) {
        self.total_loans_taken += 1;
        self.current_active_loans += 1;
        self.last_loan_date = Some(now);
        self.updated_at = now;
    }

    /// Counters after a loan is fully repaid
    pub fn record_repaid(&mut self, now: DateTime<Utc>) {
        self.total_loans_repaid += 1;
        self.current_active_loans = self.current_active_loans.saturating_sub(1);
        self.updated_at = now;
    }

    /// Undoes `record_repaid` when a completed loan is reopened by a reversal
    pub fn record_reopened(&mut self, now: DateTime<Utc>) {
        self.total_loans_repaid = self.total_loans_repaid.saturating_sub(1);
        self.current_active_loans += 1;
        self.updated_at = now;
    }

    /// Counters after a loan is marked defaulted
    pub fn record_default(&mut self, now: DateTime<Utc>) {
        self.total_defaults += 1;
        self.current_active_loans = self.current_active_loans.saturating_sub(1);
        self.updated_at = now;
    }

    /// Shifts the score by `delta`, clamped to 0..=100
    pub fn adjust_credit_score(&mut self, delta: i32, now: DateTime<Utc>) {
        let adjusted = (i32::from(self.credit_score) + delta).clamp(0, i32::from(MAX_CREDIT_SCORE));
        debug!(client = %self.id, delta, from = self.credit_score, to = adjusted, "credit score adjusted");
        self.credit_score = adjusted as u8;
        self.updated_at = now;
    }

    /// Sets the score from a manual adjustment or a recomputation
    pub fn set_credit_score(&mut self, score: i64, now: DateTime<Utc>) -> Result<u8, ClientError> {
        if !(0..=i64::from(MAX_CREDIT_SCORE)).contains(&score) {
            return Err(ClientError::InvalidCreditScore(score));
        }
        let previous = self.credit_score;
        self.credit_score = score as u8;
        self.updated_at = now;
        debug!(client = %self.id, from = previous, to = self.credit_score, "credit score set");
        Ok(previous)
    }

    /// Blacklists or reinstates the client
    ///
    /// Blacklisting requires a reason; reinstating clears it.
    pub fn set_eligibility(
        &mut self,
        eligible: bool,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        if eligible {
            self.is_eligible = true;
            self.blacklist_reason = None;
        } else {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| ClientError::validation("A blacklist reason is required"))?;
            self.is_eligible = false;
            self.blacklist_reason = Some(reason.to_string());
        }
        debug!(client = %self.id, eligible, "eligibility changed");
        self.updated_at = now;
        Ok(())
    }

    /// Flips eligibility; a reason is required when the flip blacklists
    pub fn toggle_eligibility(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> Result<(), ClientError> {
        let target = !self.is_eligible;
        self.set_eligibility(target, reason, now)
    }

    /// Clients with any loan history are kept for audit
    pub fn can_be_deleted(&self, has_loan_history: bool) -> bool {
        !has_loan_history && self.total_loans_taken == 0
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.national_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            county: "Nairobi".into(),
            sub_location: "Kilimani".into(),
            location: "Westlands".into(),
            street: None,
        }
    }

    fn request() -> NewClient {
        NewClient {
            first_name: " Amina ".into(),
            middle_name: Some("".into()),
            last_name: "Otieno".into(),
            phone_number: "0712345678".into(),
            national_id: "30111222".into(),
            address: address(),
            emergency_contact: EmergencyContact {
                full_name: "Peter Otieno".into(),
                phone_number: "0722000111".into(),
                relationship: Relationship::Brother,
                national_id: "28999000".into(),
                address: address(),
            },
        }
    }

    #[test]
    fn test_register_defaults() {
        let client = Client::register(request(), UserId::new(), Utc::now()).unwrap();
        assert_eq!(client.first_name, "Amina");
        assert!(client.middle_name.is_none());
        assert_eq!(client.credit_score, 100);
        assert!(client.is_eligible);
        assert_eq!(client.full_name(), "Amina Otieno");
    }

    #[test]
    fn test_register_rejects_missing_county() {
        let mut req = request();
        req.emergency_contact.address.county = String::new();
        let result = Client::register(req, UserId::new(), Utc::now());
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[test]
    fn test_register_rejects_short_phone() {
        let mut req = request();
        req.phone_number = "0712".into();
        assert!(Client::register(req, UserId::new(), Utc::now()).is_err());
    }

    #[test]
    fn test_counters_round_trip() {
        let now = Utc::now();
        let mut client = Client::register(request(), UserId::new(), now).unwrap();

        client.record_disbursement(now);
        assert_eq!((client.total_loans_taken, client.current_active_loans), (1, 1));

        client.record_repaid(now);
        assert_eq!((client.total_loans_repaid, client.current_active_loans), (1, 0));

        client.record_reopened(now);
        assert_eq!((client.total_loans_repaid, client.current_active_loans), (0, 1));

        client.record_default(now);
        assert_eq!((client.total_defaults, client.current_active_loans), (1, 0));
        assert!(!client.can_be_deleted(false));
    }

    #[test]
    fn test_score_adjustment_clamps() {
        let now = Utc::now();
        let mut client = Client::register(request(), UserId::new(), now).unwrap();
        client.adjust_credit_score(5, now);
        assert_eq!(client.credit_score, 100);

        client.set_credit_score(1, now).unwrap();
        client.adjust_credit_score(-2, now);
        assert_eq!(client.credit_score, 0);

        assert!(matches!(client.set_credit_score(101, now), Err(ClientError::InvalidCreditScore(101))));
        assert!(client.set_credit_score(-1, now).is_err());
    }

    #[test]
    fn test_blacklist_requires_reason() {
        let now = Utc::now();
        let mut client = Client::register(request(), UserId::new(), now).unwrap();

        assert!(client.toggle_eligibility(None, now).is_err());
        assert!(client.is_eligible);

        client.toggle_eligibility(Some("Fraudulent documents"), now).unwrap();
        assert!(!client.is_eligible);
        assert!(matches!(client.ensure_can_borrow(), Err(ClientError::Ineligible { .. })));

        client.toggle_eligibility(None, now).unwrap();
        assert!(client.is_eligible);
        assert!(client.blacklist_reason.is_none());
    }
}
