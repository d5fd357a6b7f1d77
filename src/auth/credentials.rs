//! Credential verification
//!
//! The leaf trust primitive: looks a user up by normalized username,
//! hashes the supplied password and compares digests in constant time.
//! Unknown username and wrong password both come back as the same
//! [`AuthError::InvalidCredentials`], and the unknown-user path performs
//! the same hashing and comparison work, so callers get no
//! username-existence oracle through either the error or the timing.

use crate::domain::errors::AuthError;
use crate::domain::user::{normalize_username, UserIdentity};
use crate::domain::Result;
use crate::storage::UserStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Hex SHA-256 digest of the empty string, compared against when the
/// username is unknown
const UNKNOWN_USER_DIGEST: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Computes the stored password hash for a raw password
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compares two byte strings without short-circuiting on the first
/// mismatching byte
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Verifies username/password pairs against stored hashes
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl CredentialStore {
    /// Creates a credential store over a user directory
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Verifies the pair, returning the stripped identity on success
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for unknown usernames and
    /// hash mismatches alike. Storage failures propagate unchanged.
    pub async fn verify(&self, username: &str, password: &str) -> Result<UserIdentity> {
        let normalized = normalize_username(username);
        let user = self.users.find_by_username(&normalized).await?;
        let supplied = hash_password(password);

        match user {
            Some(user) => {
                if constant_time_eq(supplied.as_bytes(), user.password_hash.as_bytes()) {
                    Ok(user.identity())
                } else {
                    Err(AuthError::InvalidCredentials.into())
                }
            }
            None => {
                // Burn the same comparison work as the known-user path
                let _ = constant_time_eq(supplied.as_bytes(), UNKNOWN_USER_DIGEST.as_bytes());
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::MedgateError;
    use crate::domain::ids::UserId;
    use crate::domain::user::{Role, User};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct InMemoryUsers {
        by_username: HashMap<String, User>,
    }

    impl InMemoryUsers {
        fn with_user(username: &str, password: &str, role: Role) -> Self {
            let user = User {
                id: UserId::new(1),
                username: username.to_string(),
                password_hash: hash_password(password),
                role,
                created_at: Utc::now(),
            };
            let mut by_username = HashMap::new();
            by_username.insert(username.to_string(), user);
            Self { by_username }
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUsers {
        async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            Ok(self.by_username.get(username).cloned())
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
            Ok(self
                .by_username
                .values()
                .find(|u| u.id == id)
                .cloned())
        }

        async fn insert_if_absent(&self, _: &str, _: &str, _: Role) -> Result<bool> {
            unimplemented!("not needed for credential tests")
        }
    }

    #[test]
    fn test_hash_password_is_deterministic() {
        assert_eq!(hash_password("secret"), hash_password("secret"));
        assert_ne!(hash_password("secret"), hash_password("Secret"));
        assert_eq!(hash_password("").len(), 64);
    }

    #[test]
    fn test_empty_digest_constant_matches() {
        assert_eq!(hash_password(""), UNKNOWN_USER_DIGEST);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[tokio::test]
    async fn test_verify_success() {
        let store = CredentialStore::new(Arc::new(InMemoryUsers::with_user(
            "doctor",
            "DoctorPass123!",
            Role::Doctor,
        )));
        let identity = store.verify("doctor", "DoctorPass123!").await.unwrap();
        assert_eq!(identity.role, Role::Doctor);
    }

    #[tokio::test]
    async fn test_verify_normalizes_username() {
        let store = CredentialStore::new(Arc::new(InMemoryUsers::with_user(
            "doctor",
            "DoctorPass123!",
            Role::Doctor,
        )));
        assert!(store.verify("  DOCTOR ", "DoctorPass123!").await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let store = CredentialStore::new(Arc::new(InMemoryUsers::with_user(
            "doctor",
            "DoctorPass123!",
            Role::Doctor,
        )));

        let wrong_password = store.verify("doctor", "nope").await.unwrap_err();
        let unknown_user = store.verify("ghost", "nope").await.unwrap_err();

        let a = match wrong_password {
            MedgateError::Auth(e) => e,
            other => panic!("expected auth error, got {other:?}"),
        };
        let b = match unknown_user {
            MedgateError::Auth(e) => e,
            other => panic!("expected auth error, got {other:?}"),
        };
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }
}
