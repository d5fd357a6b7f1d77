//! SQLite schema and migrations
//!
//! Three tables: `users`, `patients`, `logs`. Timestamps are always bound
//! from Rust rather than relying on SQL defaults, so every stored instant
//! went through the same clock. Running the migrations is idempotent.

use sqlx::sqlite::SqlitePool;

/// DDL statements, applied in order
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL CHECK(role IN ('admin', 'doctor', 'receptionist')),
        created_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS patients (
        patient_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        contact TEXT NOT NULL,
        diagnosis TEXT NOT NULL,
        anonymized_name TEXT NOT NULL,
        anonymized_contact TEXT NOT NULL,
        diagnosis_masked TEXT NOT NULL,
        date_added TIMESTAMP NOT NULL,
        last_updated TIMESTAMP NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS logs (
        log_id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        action TEXT NOT NULL,
        details TEXT,
        timestamp TIMESTAMP NOT NULL,
        FOREIGN KEY(user_id) REFERENCES users(user_id) ON DELETE RESTRICT
    )",
    "CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name)",
    "CREATE INDEX IF NOT EXISTS idx_logs_user_id ON logs(user_id)",
];

/// Creates the tables and indexes if they do not exist
///
/// # Errors
///
/// Returns the underlying driver error if any statement fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = MIGRATIONS.len(), "Schema migrations applied");
    Ok(())
}
