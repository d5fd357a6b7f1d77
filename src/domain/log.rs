//! Audit log entry model

use crate::domain::ids::{LogId, UserId};
use crate::domain::user::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of auditable actions
///
/// Every security-relevant event maps into one of these; the set is part
/// of the persisted schema and must not grow casually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Login,
    LoginFailed,
    View,
    Update,
    Anonymize,
    Export,
    Denied,
}

impl LogAction {
    /// Returns the action name as persisted in the `logs` table
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Login => "login",
            LogAction::LoginFailed => "login_failed",
            LogAction::View => "view",
            LogAction::Update => "update",
            LogAction::Anonymize => "anonymize",
            LogAction::Export => "export",
            LogAction::Denied => "denied",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(LogAction::Login),
            "login_failed" => Ok(LogAction::LoginFailed),
            "view" => Ok(LogAction::View),
            "update" => Ok(LogAction::Update),
            "anonymize" => Ok(LogAction::Anonymize),
            "export" => Ok(LogAction::Export),
            "denied" => Ok(LogAction::Denied),
            other => Err(format!("unknown log action: {other}")),
        }
    }
}

/// An entry waiting to be appended to the audit log
///
/// The id and timestamp are assigned by the log itself at append time so
/// that ordering is server-controlled.
#[derive(Debug, Clone)]
pub struct LogDraft {
    pub user_id: UserId,
    pub role: Role,
    pub action: LogAction,
    /// Opaque structured payload; never contains raw patient field values
    pub details: serde_json::Value,
}

impl LogDraft {
    /// Creates a draft with a structured details payload
    pub fn new(user_id: UserId, role: Role, action: LogAction, details: serde_json::Value) -> Self {
        Self {
            user_id,
            role,
            action,
            details,
        }
    }
}

/// A committed, immutable audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogId,
    pub user_id: UserId,
    pub role: Role,
    pub action: LogAction,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
