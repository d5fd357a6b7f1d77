//! Domain error types
//!
//! The error hierarchy mirrors the four caller-visible categories the
//! service exposes: authentication, authorization, validation and storage.
//! Errors never leak low-level driver detail through their Display form;
//! anything useful for operators goes to the tracing layer instead.

use crate::domain::ids::PatientId;
use crate::domain::user::Role;
use crate::policy::PolicyAction;
use thiserror::Error;

/// Main Medgate error type
///
/// This is the primary error type used throughout the crate. It wraps the
/// category-specific error types so callers can match on a small, stable
/// set of variants.
#[derive(Debug, Error)]
pub enum MedgateError {
    /// Authentication failures (bad credentials)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Authorization failures (role forbids action)
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Malformed or missing input fields
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Repository or audit-log failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Authentication errors
///
/// Deliberately a single generic variant: unknown username and wrong
/// password must be indistinguishable to the caller, so there is nothing
/// more specific to say.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials did not verify
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Authorization errors
///
/// Carries the role and attempted action for the audit trail; the Display
/// form stays generic.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("action not permitted for this role")]
pub struct AuthorizationError {
    /// Role that attempted the action
    pub role: Role,
    /// Action that was refused
    pub action: PolicyAction,
}

/// Input validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or missing
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Contact string has fewer than four digits
    #[error("contact must contain at least four digits")]
    MalformedContact,

    /// Referenced patient does not exist
    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),
}

/// Storage errors
///
/// The message is category-level only; the underlying driver error is
/// logged where it occurs, not surfaced to callers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The repository rejected or failed a read/write
    #[error("storage operation failed")]
    Repository(String),

    /// The audit log append failed; any mutation in the same call was
    /// rolled back
    #[error("audit log append failed")]
    AuditAppend(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Repository(err.to_string())
    }
}

impl From<sqlx::Error> for MedgateError {
    fn from(err: sqlx::Error) -> Self {
        MedgateError::Storage(StorageError::from(err))
    }
}

impl From<std::io::Error> for MedgateError {
    fn from(err: std::io::Error) -> Self {
        MedgateError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for MedgateError {
    fn from(err: toml::de::Error) -> Self {
        MedgateError::Configuration(format!("TOML parse error: {err}"))
    }
}
