//! Result type alias for Medgate operations

use crate::domain::errors::MedgateError;

/// Convenience alias used by all fallible Medgate APIs
pub type Result<T> = std::result::Result<T, MedgateError>;
