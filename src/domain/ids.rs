//! Domain identifier types
//!
//! Newtype wrappers around SQLite row ids so user, patient and log
//! identifiers cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use medgate::domain::UserId;
///
/// let id = UserId::new(7);
/// assert_eq!(id.as_i64(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a new UserId from a raw row id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Patient identifier newtype wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(i64);

impl PatientId {
    /// Creates a new PatientId from a raw row id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PatientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Audit log entry identifier newtype wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(i64);

impl LogId {
    /// Creates a new LogId from a raw row id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for LogId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
