//! Session context
//!
//! A session is a value issued at login and threaded explicitly through
//! every service call; there is no ambient "current user" state. Sessions
//! are not persisted — dropping the value is logout.

use crate::domain::ids::UserId;
use crate::domain::user::{Role, UserIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token
    pub token: Uuid,
    /// The verified identity this session was issued for
    pub user: UserIdentity,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Issues a fresh session for a verified identity
    pub fn issue(user: UserIdentity) -> Self {
        Self {
            token: Uuid::new_v4(),
            user,
            issued_at: Utc::now(),
        }
    }

    /// The caller's role
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// The caller's user id
    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}
