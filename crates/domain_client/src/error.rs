//! Client domain errors

use thiserror::Error;

/// Errors that can occur in the client domain
#[derive(Debug, Error)]
pub enum ClientError {
    /// Profile data failed validation
    #[error("Invalid client data: {0}")]
    Validation(String),

    /// The client is blacklisted or otherwise barred from borrowing
    #[error("Client {client} is not eligible for a loan: {reason}")]
    Ineligible { client: String, reason: String },

    /// Credit scores live in 0..=100
    #[error("Credit score must be between 0 and 100, got {0}")]
    InvalidCreditScore(i64),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn ineligible(client: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        ClientError::Ineligible {
            client: client.to_string(),
            reason: reason.into(),
        }
    }

    /// Joins the messages produced by `validator`
    pub fn from_validation_errors(errors: &validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        if messages.is_empty() {
            messages.push(errors.to_string());
        }
        messages.sort();
        ClientError::Validation(messages.join("; "))
    }
}
