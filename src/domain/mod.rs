//! Domain models and types for Medgate.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`UserId`], [`PatientId`], [`LogId`])
//! - **Domain models** ([`User`], [`Patient`], [`LogEntry`])
//! - **Error types** ([`MedgateError`] and its category errors)
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a [`UserId`] can never be passed
//! where a [`PatientId`] is expected, and [`PatientWrite`] is the only way
//! to construct a patient mutation, which keeps the raw and masked fields
//! consistent by construction.

pub mod errors;
pub mod ids;
pub mod log;
pub mod patient;
pub mod result;
pub mod user;

pub use errors::{AuthError, AuthorizationError, MedgateError, StorageError, ValidationError};
pub use ids::{LogId, PatientId, UserId};
pub use log::{LogAction, LogDraft, LogEntry};
pub use patient::{Patient, PatientView, PatientWrite, RawPatientFields};
pub use result::Result;
pub use user::{normalize_username, Role, User, UserIdentity};
