//! Role-based access policy
//!
//! A single closed authorization table checked at one chokepoint (the
//! service façade). The table is a total function over (role, action);
//! everything not explicitly allowed is denied. Decisions are pure — the
//! façade is responsible for recording the outcome in the audit log.

use crate::domain::user::Role;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The actions the policy table is defined over
///
/// Resource class is folded into the action name (`ViewRawPatient` vs
/// `ViewMaskedPatient`), which keeps the table two-dimensional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    ViewRawPatient,
    ViewMaskedPatient,
    AddPatient,
    EditPatient,
    DeletePatient,
    TriggerAnonymize,
    ExportPatients,
    ExportLogs,
    ViewLogs,
}

impl PolicyAction {
    /// Returns the action name as recorded in audit details
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::ViewRawPatient => "view_raw_patient",
            PolicyAction::ViewMaskedPatient => "view_masked_patient",
            PolicyAction::AddPatient => "add_patient",
            PolicyAction::EditPatient => "edit_patient",
            PolicyAction::DeletePatient => "delete_patient",
            PolicyAction::TriggerAnonymize => "trigger_anonymize",
            PolicyAction::ExportPatients => "export_patients",
            PolicyAction::ExportLogs => "export_logs",
            PolicyAction::ViewLogs => "view_logs",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// True if the decision permits the action
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Authorizes `role` to perform `action`
///
/// Pure and side-effect free. The match lists the allowed cells of the
/// table explicitly; the wildcard arm denies, so any combination not
/// spelled out fails safe.
pub fn authorize(role: Role, action: PolicyAction) -> Decision {
    use PolicyAction::*;
    use Role::*;

    match (role, action) {
        // Admin holds every permission
        (Admin, _) => Decision::Allow,

        // Doctors read masked clinical data only
        (Doctor, ViewMaskedPatient) => Decision::Allow,

        // Receptionists manage demographics but never read clinical data
        (Receptionist, AddPatient) => Decision::Allow,
        (Receptionist, EditPatient) => Decision::Allow,

        _ => Decision::Deny,
    }
}
