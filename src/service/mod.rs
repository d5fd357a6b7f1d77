//! Access-controlled patient service façade
//!
//! Every externally visible operation runs the same sequence: resolve the
//! caller's role from the explicit [`Session`], check the policy table,
//! perform the effect, and record exactly one audit entry for the call —
//! `denied` when the policy refused, the real action otherwise. The audit
//! append is part of the call: a mutation whose log write fails is rolled
//! back by the storage layer, and the caller sees a storage error instead
//! of a partial result.

use crate::auth::{CredentialStore, Session};
use crate::domain::errors::{AuthError, AuthorizationError, MedgateError, ValidationError};
use crate::domain::ids::PatientId;
use crate::domain::log::{LogAction, LogDraft, LogEntry};
use crate::domain::patient::{PatientView, PatientWrite, RawPatientFields};
use crate::domain::user::normalize_username;
use crate::domain::Result;
use crate::policy::{authorize, PolicyAction};
use crate::storage::{AuditLog, PatientRepository, SqliteStore, UserStore};
use serde_json::json;
use std::sync::Arc;

/// The service façade composing policy, storage, masking and audit
pub struct PatientService {
    users: Arc<dyn UserStore>,
    patients: Arc<dyn PatientRepository>,
    audit: Arc<dyn AuditLog>,
    credentials: CredentialStore,
}

impl PatientService {
    /// Composes a service from its storage seams
    pub fn new(
        users: Arc<dyn UserStore>,
        patients: Arc<dyn PatientRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        let credentials = CredentialStore::new(users.clone());
        Self {
            users,
            patients,
            audit,
            credentials,
        }
    }

    /// Convenience constructor over a single SQLite store
    pub fn with_sqlite(store: Arc<SqliteStore>) -> Self {
        Self::new(store.clone(), store.clone(), store)
    }

    /// Authenticates a caller and issues a session
    ///
    /// Successful logins and failed attempts against existing accounts are
    /// both audited. The returned error never distinguishes an unknown
    /// username from a wrong password.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        match self.credentials.verify(username, password).await {
            Ok(identity) => {
                self.audit
                    .record(LogDraft::new(
                        identity.id,
                        identity.role,
                        LogAction::Login,
                        json!({"username": identity.username}),
                    ))
                    .await?;
                tracing::info!(user_id = %identity.id, role = %identity.role, "Login succeeded");
                Ok(Session::issue(identity))
            }
            Err(MedgateError::Auth(_)) => {
                // Audit the failure when the account exists; the log table
                // requires a real user id, so unknown usernames only get a
                // structured warning.
                if let Some(user) = self
                    .users
                    .find_by_username(&normalize_username(username))
                    .await?
                {
                    self.audit
                        .record(LogDraft::new(
                            user.id,
                            user.role,
                            LogAction::LoginFailed,
                            json!({"reason": "credential mismatch"}),
                        ))
                        .await?;
                } else {
                    tracing::warn!("Login attempt for unknown username");
                }
                Err(AuthError::InvalidCredentials.into())
            }
            Err(other) => Err(other),
        }
    }

    /// Lists patients with fields filtered by the caller's role
    ///
    /// Admin sees raw and masked fields, doctor sees masked fields only;
    /// any other role is denied by the policy table.
    pub async fn list_patients(&self, session: &Session) -> Result<Vec<PatientView>> {
        let role = session.role();

        if authorize(role, PolicyAction::ViewRawPatient).is_allowed() {
            let patients = self.patients.list().await?;
            self.record(
                session,
                LogAction::View,
                json!({"target": "patients", "scope": "raw", "count": patients.len()}),
            )
            .await?;
            Ok(patients.iter().map(PatientView::raw_and_masked).collect())
        } else if authorize(role, PolicyAction::ViewMaskedPatient).is_allowed() {
            let patients = self.patients.list().await?;
            self.record(
                session,
                LogAction::View,
                json!({"target": "patients", "scope": "masked", "count": patients.len()}),
            )
            .await?;
            Ok(patients.iter().map(PatientView::masked_only).collect())
        } else {
            Err(self.deny(session, PolicyAction::ViewMaskedPatient).await?)
        }
    }

    /// Fetches a single patient with role-filtered fields
    pub async fn get_patient(&self, session: &Session, id: PatientId) -> Result<PatientView> {
        let role = session.role();
        let scope = if authorize(role, PolicyAction::ViewRawPatient).is_allowed() {
            "raw"
        } else if authorize(role, PolicyAction::ViewMaskedPatient).is_allowed() {
            "masked"
        } else {
            return Err(self.deny(session, PolicyAction::ViewMaskedPatient).await?);
        };

        match self.patients.get(id).await? {
            Some(patient) => {
                self.record(
                    session,
                    LogAction::View,
                    json!({"target": "patient", "patient_id": id.as_i64(), "scope": scope}),
                )
                .await?;
                Ok(if scope == "raw" {
                    PatientView::raw_and_masked(&patient)
                } else {
                    PatientView::masked_only(&patient)
                })
            }
            None => {
                self.record(
                    session,
                    LogAction::View,
                    json!({"target": "patient", "patient_id": id.as_i64(), "rejected": "unknown patient"}),
                )
                .await?;
                Err(ValidationError::UnknownPatient(id).into())
            }
        }
    }

    /// Adds a patient; masks are derived from the raw fields in the same
    /// transaction as the insert
    pub async fn add_patient(&self, session: &Session, raw: RawPatientFields) -> Result<PatientId> {
        self.gate(session, PolicyAction::AddPatient).await?;

        let write = match PatientWrite::new(raw) {
            Ok(write) => write,
            Err(err) => {
                self.record(
                    session,
                    LogAction::Update,
                    json!({"op": "add_patient", "rejected": err.to_string()}),
                )
                .await?;
                return Err(err.into());
            }
        };

        let draft = LogDraft::new(
            session.user_id(),
            session.role(),
            LogAction::Update,
            json!({"op": "add_patient"}),
        );
        let id = self.patients.create(write, draft).await?;
        tracing::info!(patient_id = %id, "Patient added");
        Ok(id)
    }

    /// Replaces a patient's raw fields, recomputing all three masks
    pub async fn edit_patient(
        &self,
        session: &Session,
        id: PatientId,
        raw: RawPatientFields,
    ) -> Result<()> {
        self.gate(session, PolicyAction::EditPatient).await?;

        let write = match PatientWrite::new(raw) {
            Ok(write) => write,
            Err(err) => {
                self.record(
                    session,
                    LogAction::Update,
                    json!({"op": "edit_patient", "patient_id": id.as_i64(), "rejected": err.to_string()}),
                )
                .await?;
                return Err(err.into());
            }
        };

        let draft = LogDraft::new(
            session.user_id(),
            session.role(),
            LogAction::Update,
            json!({"op": "edit_patient", "patient_id": id.as_i64()}),
        );
        if self.patients.set_raw_fields(id, write, draft).await? {
            tracing::info!(patient_id = %id, "Patient updated");
            Ok(())
        } else {
            self.record(
                session,
                LogAction::Update,
                json!({"op": "edit_patient", "patient_id": id.as_i64(), "rejected": "unknown patient"}),
            )
            .await?;
            Err(ValidationError::UnknownPatient(id).into())
        }
    }

    /// Recomputes masked fields for every stored patient
    ///
    /// Returns the number of records whose masks actually changed. The
    /// repository re-reads each row, recomputes its masks and appends the
    /// audit entry in a single transaction, so a concurrent edit can never
    /// have its fresh masks overwritten by values derived from stale raw
    /// fields.
    pub async fn trigger_anonymize_all(&self, session: &Session) -> Result<usize> {
        self.gate(session, PolicyAction::TriggerAnonymize).await?;

        let draft = LogDraft::new(
            session.user_id(),
            session.role(),
            LogAction::Anonymize,
            json!({}),
        );
        match self.patients.refresh_masks(draft).await {
            Ok(updated) => {
                tracing::info!(updated, "Anonymization pass complete");
                Ok(updated)
            }
            Err(MedgateError::Validation(err)) => {
                // Stored contacts were validated on write; reaching this
                // means a row was corrupted out of band. The repository
                // rolled everything back without logging.
                self.record(
                    session,
                    LogAction::Anonymize,
                    json!({"rejected": err.to_string()}),
                )
                .await?;
                Err(err.into())
            }
            Err(other) => Err(other),
        }
    }

    /// Deletes a patient record (admin only per the policy table)
    pub async fn delete_patient(&self, session: &Session, id: PatientId) -> Result<()> {
        self.gate(session, PolicyAction::DeletePatient).await?;

        let draft = LogDraft::new(
            session.user_id(),
            session.role(),
            LogAction::Update,
            json!({"op": "delete_patient", "patient_id": id.as_i64()}),
        );
        if self.patients.delete(id, draft).await? {
            tracing::info!(patient_id = %id, "Patient deleted");
            Ok(())
        } else {
            self.record(
                session,
                LogAction::Update,
                json!({"op": "delete_patient", "patient_id": id.as_i64(), "rejected": "unknown patient"}),
            )
            .await?;
            Err(ValidationError::UnknownPatient(id).into())
        }
    }

    /// Exports patient rows (admin only per the policy table)
    pub async fn export_patients(&self, session: &Session) -> Result<Vec<PatientView>> {
        self.gate(session, PolicyAction::ExportPatients).await?;

        let patients = self.patients.list().await?;
        self.record(
            session,
            LogAction::Export,
            json!({"target": "patients", "count": patients.len()}),
        )
        .await?;
        Ok(patients.iter().map(PatientView::raw_and_masked).collect())
    }

    /// Exports the audit log (admin only)
    ///
    /// The returned sequence is a snapshot taken before this call's own
    /// export entry is appended.
    pub async fn export_logs(&self, session: &Session) -> Result<Vec<LogEntry>> {
        self.gate(session, PolicyAction::ExportLogs).await?;

        let entries = self.audit.list_all().await?;
        self.record(
            session,
            LogAction::Export,
            json!({"target": "logs", "count": entries.len()}),
        )
        .await?;
        Ok(entries)
    }

    /// Lists the audit log, oldest first (admin only)
    pub async fn list_logs(&self, session: &Session) -> Result<Vec<LogEntry>> {
        self.gate(session, PolicyAction::ViewLogs).await?;

        let entries = self.audit.list_all().await?;
        self.record(
            session,
            LogAction::View,
            json!({"target": "logs", "count": entries.len()}),
        )
        .await?;
        Ok(entries)
    }

    /// Checks the policy table, auditing and failing the call on deny
    async fn gate(&self, session: &Session, action: PolicyAction) -> Result<()> {
        if authorize(session.role(), action).is_allowed() {
            Ok(())
        } else {
            Err(self.deny(session, action).await?)
        }
    }

    /// Records a `denied` entry and builds the authorization error
    ///
    /// Returns `Ok(error)` so callers can `?` away audit-append failures
    /// while still surfacing the denial.
    async fn deny(&self, session: &Session, action: PolicyAction) -> Result<MedgateError> {
        tracing::warn!(role = %session.role(), action = %action, "Access denied");
        self.audit
            .record(LogDraft::new(
                session.user_id(),
                session.role(),
                LogAction::Denied,
                json!({"attempted": action.as_str()}),
            ))
            .await?;
        Ok(AuthorizationError {
            role: session.role(),
            action,
        }
        .into())
    }

    /// Records a non-denied audit entry for the current caller
    async fn record(
        &self,
        session: &Session,
        action: LogAction,
        details: serde_json::Value,
    ) -> Result<()> {
        self.audit
            .record(LogDraft::new(
                session.user_id(),
                session.role(),
                action,
                details,
            ))
            .await?;
        Ok(())
    }
}
