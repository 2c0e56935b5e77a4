//! # DomainError
//!
//! Centralized error handling for the civic-board ecosystem.
//! Maps domain-specific failures to actionable error types; the HTTP layer
//! turns each variant into exactly one status code.

use serde::Serialize;
use thiserror::Error;

/// A single rejected input field.
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

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// One or more input fields failed validation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Request was well-formed but cannot be honoured (duplicate email, bad login).
    #[error("{0}")]
    InvalidRequest(String),

    /// Missing, expired or otherwise unusable credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed (ownership/role mismatch, banned account).
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found (e.g., Problem, Solution, User)
    #[error("{kind} not found")]
    NotFound { kind: &'static str, id: String },

    /// Infrastructure failure (e.g., DB down, media host timeout)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn access_denied() -> Self {
        Self::Forbidden("Access denied".to_string())
    }
}

impl From<anyhow::Error> for DomainError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain in the log line.
        Self::Internal(format!("{err:#}"))
    }
}

/// Why a bearer credential was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("malformed token")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token rejected: {0}")]
    Rejected(String),
}

impl CredentialError {
    /// The message shown to the caller; deliberately coarse.
    pub fn client_message(&self) -> &'static str {
        match self {
            CredentialError::Expired => "Token has expired",
            CredentialError::Malformed | CredentialError::InvalidSignature => "Invalid token",
            CredentialError::Rejected(_) => "Token verification failed",
        }
    }
}

impl From<CredentialError> for DomainError {
    fn from(err: CredentialError) -> Self {
        DomainError::Unauthorized(err.client_message().to_string())
    }
}

/// A specialized Result type for civic-board logic.
pub type Result<T> = std::result::Result<T, DomainError>;
