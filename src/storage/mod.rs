//! Storage abstraction and SQLite adapter
//!
//! This module defines the async traits the service façade depends on and
//! the SQLite implementation behind them. The traits carry no policy
//! logic; they trust their caller. Mutating patient operations accept the
//! audit [`LogDraft`] for the call and commit the row write and the log
//! append in one transaction, so an action whose log write failed never
//! leaves a stored effect behind.

pub mod schema;
pub mod sqlite;

use crate::domain::ids::{PatientId, UserId};
use crate::domain::log::{LogDraft, LogEntry};
use crate::domain::patient::{Patient, PatientWrite};
use crate::domain::user::{Role, User};
use crate::domain::Result;
use async_trait::async_trait;

pub use sqlite::SqliteStore;

/// User account lookup and provisioning
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by normalized (lowercase) username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Looks up a user by id
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Inserts a user unless the username already exists
    ///
    /// Existing rows are left untouched, which makes seeding idempotent.
    /// Returns `true` if a row was inserted.
    async fn insert_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<bool>;
}

/// Patient CRUD, gated entirely by the service layer
///
/// `create` and `set_raw_fields` take a [`PatientWrite`], the only
/// constructor of a raw+masked column set, and append the given audit
/// draft in the same transaction as the row write.
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Inserts a new patient and its audit entry atomically
    ///
    /// The new `patient_id` is merged into the draft's details payload
    /// before the append.
    async fn create(&self, write: PatientWrite, entry: LogDraft) -> Result<PatientId>;

    /// Fetches a single patient
    async fn get(&self, id: PatientId) -> Result<Option<Patient>>;

    /// Lists all patients, newest first
    async fn list(&self) -> Result<Vec<Patient>>;

    /// Replaces the raw fields and their recomputed masks atomically
    ///
    /// Returns `false` (with nothing written, audit entry included) if the
    /// patient does not exist.
    async fn set_raw_fields(
        &self,
        id: PatientId,
        write: PatientWrite,
        entry: LogDraft,
    ) -> Result<bool>;

    /// Recomputes masked columns from the current raw fields, rewriting
    /// stale rows and appending the audit entry in one transaction
    ///
    /// Rows are re-read inside the transaction, so masks are always a
    /// function of the raw values committed alongside them even when the
    /// raw fields change concurrently. Scan counts are merged into the
    /// draft's details. Returns the number of rows rewritten.
    async fn refresh_masks(&self, entry: LogDraft) -> Result<usize>;

    /// Deletes a patient and its audit entry atomically
    ///
    /// Returns `false` (with nothing written, audit entry included) if the
    /// patient does not exist.
    async fn delete(&self, id: PatientId, entry: LogDraft) -> Result<bool>;
}

/// Append-only audit log
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends an entry, assigning its id and a strictly increasing
    /// timestamp
    ///
    /// The append is synchronous with respect to the triggering service
    /// call: the call does not return until the entry is durable or the
    /// append has explicitly failed.
    async fn record(&self, draft: LogDraft) -> Result<LogEntry>;

    /// Returns every entry, oldest first
    async fn list_all(&self) -> Result<Vec<LogEntry>>;
}
