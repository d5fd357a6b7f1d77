//! SQLite storage adapter
//!
//! Implements [`UserStore`], [`PatientRepository`] and [`AuditLog`] over a
//! single `sqlx` connection pool. Audit timestamps come from a mutex-
//! guarded monotonic clock whose guard is held across the log insert and
//! its transaction commit, so the `log_id` order readers observe always
//! agrees with the order timestamps were assigned in.

use crate::anonymization::mask_fields;
use crate::domain::errors::StorageError;
use crate::domain::ids::{LogId, PatientId, UserId};
use crate::domain::log::{LogDraft, LogEntry};
use crate::domain::patient::{Patient, PatientWrite};
use crate::domain::user::{Role, User};
use crate::domain::Result;
use crate::storage::{schema, AuditLog, PatientRepository, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tokio::sync::Mutex;

/// SQLite-backed store for users, patients and the audit log
pub struct SqliteStore {
    pool: SqlitePool,
    /// Last audit timestamp handed out. Held across the append itself,
    /// not just the assignment, so timestamp order and `log_id` order
    /// never disagree.
    log_clock: Mutex<Option<DateTime<Utc>>>,
}

impl SqliteStore {
    /// Wraps an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            log_clock: Mutex::new(None),
        }
    }

    /// Opens (creating if missing) the database at `path` and applies the
    /// schema migrations
    ///
    /// Foreign keys are enforced; `logs.user_id` must reference an
    /// existing user at write time.
    pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;

        schema::run_migrations(&pool)
            .await
            .map_err(StorageError::from)?;

        tracing::info!(path = %path.display(), "SQLite store ready");
        Ok(Self::new(pool))
    }

    /// Verifies the connection with a trivial query
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Row counts for the three tables, used by the status command
    pub async fn table_counts(&self) -> Result<TableCounts> {
        let users = self.count("users").await?;
        let patients = self.count("patients").await?;
        let logs = self.count("logs").await?;
        Ok(TableCounts {
            users,
            patients,
            logs,
        })
    }

    async fn count(&self, table: &str) -> Result<i64> {
        // Table names come from a fixed internal list, never from input.
        let sql = format!("SELECT COUNT(*) AS n FROM {table}");
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.try_get("n").map_err(|e| StorageError::from(e).into())
    }
}

/// Assigns the next audit timestamp: wall clock, bumped past the previous
/// assignment when the clock has not advanced
///
/// Callers must keep the clock guard alive until their append is durable.
fn advance_clock(last: &mut Option<DateTime<Utc>>) -> DateTime<Utc> {
    let mut now = Utc::now();
    if let Some(prev) = *last {
        if now <= prev {
            now = prev + Duration::microseconds(1);
        }
    }
    *last = Some(now);
    now
}

/// Row counts returned by [`SqliteStore::table_counts`]
#[derive(Debug, Clone, Copy)]
pub struct TableCounts {
    pub users: i64,
    pub patients: i64,
    pub logs: i64,
}

fn user_from_row(row: &SqliteRow) -> std::result::Result<User, StorageError> {
    let role_str: String = row.try_get("role").map_err(StorageError::from)?;
    let role: Role = role_str
        .parse()
        .map_err(|e: String| StorageError::Repository(e))?;
    Ok(User {
        id: UserId::new(row.try_get("user_id").map_err(StorageError::from)?),
        username: row.try_get("username").map_err(StorageError::from)?,
        password_hash: row.try_get("password_hash").map_err(StorageError::from)?,
        role,
        created_at: row.try_get("created_at").map_err(StorageError::from)?,
    })
}

fn patient_from_row(row: &SqliteRow) -> std::result::Result<Patient, StorageError> {
    Ok(Patient {
        id: PatientId::new(row.try_get("patient_id").map_err(StorageError::from)?),
        name: row.try_get("name").map_err(StorageError::from)?,
        contact: row.try_get("contact").map_err(StorageError::from)?,
        diagnosis: row.try_get("diagnosis").map_err(StorageError::from)?,
        anonymized_name: row
            .try_get("anonymized_name")
            .map_err(StorageError::from)?,
        anonymized_contact: row
            .try_get("anonymized_contact")
            .map_err(StorageError::from)?,
        masked_diagnosis: row
            .try_get("diagnosis_masked")
            .map_err(StorageError::from)?,
        date_added: row.try_get("date_added").map_err(StorageError::from)?,
        last_updated: row.try_get("last_updated").map_err(StorageError::from)?,
    })
}

fn log_from_row(row: &SqliteRow) -> std::result::Result<LogEntry, StorageError> {
    let role_str: String = row.try_get("role").map_err(StorageError::from)?;
    let role: Role = role_str
        .parse()
        .map_err(|e: String| StorageError::Repository(e))?;
    let action_str: String = row.try_get("action").map_err(StorageError::from)?;
    let action = action_str
        .parse()
        .map_err(|e: String| StorageError::Repository(e))?;
    let details_str: Option<String> = row.try_get("details").map_err(StorageError::from)?;
    let details = match details_str {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| StorageError::Repository(format!("invalid details payload: {e}")))?,
        None => serde_json::Value::Null,
    };
    Ok(LogEntry {
        id: LogId::new(row.try_get("log_id").map_err(StorageError::from)?),
        user_id: UserId::new(row.try_get("user_id").map_err(StorageError::from)?),
        role,
        action,
        details,
        timestamp: row.try_get("timestamp").map_err(StorageError::from)?,
    })
}

/// Appends a log row through any executor (pool or open transaction)
async fn insert_log<'e, E>(
    executor: E,
    draft: &LogDraft,
    timestamp: DateTime<Utc>,
) -> std::result::Result<LogEntry, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO logs (user_id, role, action, details, timestamp)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(draft.user_id.as_i64())
    .bind(draft.role.as_str())
    .bind(draft.action.as_str())
    .bind(draft.details.to_string())
    .bind(timestamp)
    .execute(executor)
    .await?;

    Ok(LogEntry {
        id: LogId::new(result.last_insert_rowid()),
        user_id: draft.user_id,
        role: draft.role,
        action: draft.action,
        details: draft.details.clone(),
        timestamp,
    })
}

/// Merges the assigned patient id into a draft's details payload
fn with_patient_id(draft: LogDraft, id: PatientId) -> LogDraft {
    let mut draft = draft;
    if let serde_json::Value::Object(ref mut map) = draft.details {
        map.insert("patient_id".to_string(), serde_json::json!(id.as_i64()));
    }
    draft
}

/// Merges mask-refresh counts into a draft's details payload
fn with_scan_counts(draft: LogDraft, scanned: usize, updated: usize) -> LogDraft {
    let mut draft = draft;
    if let serde_json::Value::Object(ref mut map) = draft.details {
        map.insert("records_scanned".to_string(), serde_json::json!(scanned));
        map.insert("records_updated".to_string(), serde_json::json!(updated));
    }
    draft
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, username, password_hash, role, created_at
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        match row {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT user_id, username, password_hash, role, created_at
             FROM users WHERE user_id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        match row {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (username, password_hash, role, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PatientRepository for SqliteStore {
    async fn create(&self, write: PatientWrite, entry: LogDraft) -> Result<PatientId> {
        // Clock first, then the database write lock; every appending path
        // takes them in this order.
        let mut clock = self.log_clock.lock().await;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO patients (name, contact, diagnosis,
                                   anonymized_name, anonymized_contact, diagnosis_masked,
                                   date_added, last_updated)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&write.raw().name)
        .bind(&write.raw().contact)
        .bind(&write.raw().diagnosis)
        .bind(&write.masks().anonymized_name)
        .bind(&write.masks().anonymized_contact)
        .bind(&write.masks().masked_diagnosis)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        let id = PatientId::new(result.last_insert_rowid());
        let draft = with_patient_id(entry, id);
        let timestamp = advance_clock(&mut clock);
        insert_log(&mut *tx, &draft, timestamp)
            .await
            .map_err(|e| StorageError::AuditAppend(e.to_string()))?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(id)
    }

    async fn get(&self, id: PatientId) -> Result<Option<Patient>> {
        let row = sqlx::query("SELECT * FROM patients WHERE patient_id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some(row) => Ok(Some(patient_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Patient>> {
        let rows = sqlx::query("SELECT * FROM patients ORDER BY date_added DESC, patient_id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in &rows {
            patients.push(patient_from_row(row)?);
        }
        Ok(patients)
    }

    async fn set_raw_fields(
        &self,
        id: PatientId,
        write: PatientWrite,
        entry: LogDraft,
    ) -> Result<bool> {
        let mut clock = self.log_clock.lock().await;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let result = sqlx::query(
            "UPDATE patients
             SET name = ?, contact = ?, diagnosis = ?,
                 anonymized_name = ?, anonymized_contact = ?, diagnosis_masked = ?,
                 last_updated = ?
             WHERE patient_id = ?",
        )
        .bind(&write.raw().name)
        .bind(&write.raw().contact)
        .bind(&write.raw().diagnosis)
        .bind(&write.masks().anonymized_name)
        .bind(&write.masks().anonymized_contact)
        .bind(&write.masks().masked_diagnosis)
        .bind(Utc::now())
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(StorageError::from)?;
            return Ok(false);
        }

        let timestamp = advance_clock(&mut clock);
        insert_log(&mut *tx, &entry, timestamp)
            .await
            .map_err(|e| StorageError::AuditAppend(e.to_string()))?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(true)
    }

    async fn refresh_masks(&self, entry: LogDraft) -> Result<usize> {
        let mut clock = self.log_clock.lock().await;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        // Rows are read and rewritten inside one transaction, so the masks
        // written here are always derived from the raw fields committed
        // alongside them.
        let rows = sqlx::query("SELECT * FROM patients ORDER BY patient_id ASC")
            .fetch_all(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let now = Utc::now();
        let mut updated = 0usize;
        for row in &rows {
            let patient = patient_from_row(row)?;
            let masks = mask_fields(&patient.name, &patient.contact, &patient.diagnosis)?;
            let stale = masks.anonymized_name != patient.anonymized_name
                || masks.anonymized_contact != patient.anonymized_contact
                || masks.masked_diagnosis != patient.masked_diagnosis;
            if !stale {
                continue;
            }
            sqlx::query(
                "UPDATE patients
                 SET anonymized_name = ?, anonymized_contact = ?, diagnosis_masked = ?,
                     last_updated = ?
                 WHERE patient_id = ?",
            )
            .bind(&masks.anonymized_name)
            .bind(&masks.anonymized_contact)
            .bind(&masks.masked_diagnosis)
            .bind(now)
            .bind(patient.id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
            updated += 1;
        }

        let draft = with_scan_counts(entry, rows.len(), updated);
        let timestamp = advance_clock(&mut clock);
        insert_log(&mut *tx, &draft, timestamp)
            .await
            .map_err(|e| StorageError::AuditAppend(e.to_string()))?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(updated)
    }

    async fn delete(&self, id: PatientId, entry: LogDraft) -> Result<bool> {
        let mut clock = self.log_clock.lock().await;
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let result = sqlx::query("DELETE FROM patients WHERE patient_id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(StorageError::from)?;
            return Ok(false);
        }

        let timestamp = advance_clock(&mut clock);
        insert_log(&mut *tx, &entry, timestamp)
            .await
            .map_err(|e| StorageError::AuditAppend(e.to_string()))?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(true)
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn record(&self, draft: LogDraft) -> Result<LogEntry> {
        // The guard stays alive until the row is durable; two concurrent
        // appends cannot commit in the opposite order from their
        // timestamps.
        let mut clock = self.log_clock.lock().await;
        let timestamp = advance_clock(&mut clock);
        let entry = insert_log(&self.pool, &draft, timestamp)
            .await
            .map_err(|e| StorageError::AuditAppend(e.to_string()))?;
        Ok(entry)
    }

    async fn list_all(&self) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT log_id, user_id, role, action, details, timestamp
             FROM logs ORDER BY log_id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(log_from_row(row)?);
        }
        Ok(entries)
    }
}
