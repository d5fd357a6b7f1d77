//! Authentication: credential verification and session context

pub mod credentials;
pub mod session;

pub use credentials::{hash_password, CredentialStore};
pub use session::Session;
