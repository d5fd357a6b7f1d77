//! User model and role enumeration

use crate::domain::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of roles the policy table is defined over
///
/// Roles are fixed at provisioning time; there are no per-user grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including raw patient fields and the audit log
    Admin,
    /// Clinical access to masked patient data only
    Doctor,
    /// Front-desk access: may add and edit patient records
    Receptionist,
}

impl Role {
    /// Returns the role name as persisted in the `users` table
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A provisioned user account
///
/// `password_hash` never leaves the storage and auth layers; the service
/// façade only ever sees [`UserIdentity`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Case-normalized (lowercase), unique
    pub username: String,
    /// Hex-encoded SHA-256 digest of the password
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Strips the credential material, leaving only what the service needs
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// The authenticated identity threaded through service calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

/// Normalizes a username for lookup and storage
///
/// Usernames are matched case-insensitively; the canonical form is
/// trimmed lowercase.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}
