//! Typed error hierarchy for the task tracker.
//!
//! `TrackerError` covers every domain failure the HTTP layer needs to tell
//! apart. Storage code returns `anyhow::Result`, so these errors usually
//! travel wrapped in an `anyhow::Error` and are recovered with
//! `downcast_ref` at the API boundary.

use serde::Serialize;
use thiserror::Error;

/// One failed field in a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from the tracker's storage, auth and API layers.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("User {racfid} not found")]
    UserNotFound { racfid: String },

    #[error("Issue {code} not found")]
    IssueNotFound { code: String },

    #[error("Project {code} not found")]
    ProjectNotFound { code: String },

    #[error("Email {email} is already registered")]
    EmailTaken { email: String },

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid RACFID or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token invalid")]
    TokenInvalid,

    #[error("No free {prefix} code after {attempts} attempts")]
    CodeSpaceExhausted { prefix: &'static str, attempts: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    /// Shorthand for a validation failure on a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_not_found_carries_code() {
        let err = TrackerError::IssueNotFound {
            code: "JI000042".into(),
        };
        match &err {
            TrackerError::IssueNotFound { code } => assert_eq!(code, "JI000042"),
            _ => panic!("Expected IssueNotFound"),
        }
        assert!(err.to_string().contains("JI000042"));
    }

    #[test]
    fn field_shorthand_builds_single_validation_error() {
        let err = TrackerError::field("users", "at least one user is required");
        match err {
            TrackerError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "users");
            }
            _ => panic!("Expected Validation"),
        }
    }

    #[test]
    fn tracker_error_survives_anyhow_round_trip() {
        let wrapped: anyhow::Error = TrackerError::EmailTaken {
            email: "a@b.c".into(),
        }
        .into();
        assert!(matches!(
            wrapped.downcast_ref::<TrackerError>(),
            Some(TrackerError::EmailTaken { .. })
        ));
    }

    #[test]
    fn token_variants_are_distinct() {
        assert!(matches!(TrackerError::TokenExpired, TrackerError::TokenExpired));
        assert!(!matches!(TrackerError::TokenInvalid, TrackerError::TokenExpired));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&TrackerError::InvalidCredentials);
        assert_std_error(&TrackerError::CodeSpaceExhausted {
            prefix: "JI",
            attempts: 3,
        });
    }
}
