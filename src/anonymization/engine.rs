//! Field masking transforms
//!
//! Three pure, deterministic transforms from raw patient field values to
//! their masked counterparts. All of them operate on a single field value,
//! never on a full record, so they are unit-testable without storage.
//!
//! Tokens are derived from a SHA-256 digest of the input, so the same raw
//! value always yields the same masked value and the original cannot be
//! recovered from the token.

use crate::domain::errors::ValidationError;
use sha2::{Digest, Sha256};

/// Length of the hex token appended to `ANON_`
const NAME_TOKEN_LEN: usize = 10;

/// Length of the hex token appended to `MASKED_`
const DIAGNOSIS_TOKEN_LEN: usize = 12;

/// Derives a stable hex token from a field value
///
/// Truncating the SHA-256 digest keeps tokens short while leaving
/// collisions between distinct inputs negligible at this dataset size.
fn stable_token(value: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{digest:x}");
    hex[..len].to_string()
}

/// Masks a patient name as `ANON_<token>`
///
/// # Examples
///
/// ```
/// use medgate::anonymization::mask_name;
///
/// let masked = mask_name("Jane Doe");
/// assert!(masked.starts_with("ANON_"));
/// assert_eq!(masked, mask_name("Jane Doe"));
/// ```
pub fn mask_name(name: &str) -> String {
    format!("ANON_{}", stable_token(name, NAME_TOKEN_LEN))
}

/// Masks a contact string as `XXX-XXX-<last four digits>`
///
/// # Errors
///
/// Returns [`ValidationError::MalformedContact`] when the input contains
/// fewer than four digits.
pub fn mask_contact(contact: &str) -> Result<String, ValidationError> {
    let digits: Vec<char> = contact.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return Err(ValidationError::MalformedContact);
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    Ok(format!("XXX-XXX-{last_four}"))
}

/// Masks a diagnosis as `MASKED_<token>`
///
/// One-way by construction: the token is a truncated digest, so no code
/// path can recover the original diagnosis from the masked value.
pub fn mask_diagnosis(diagnosis: &str) -> String {
    format!("MASKED_{}", stable_token(diagnosis, DIAGNOSIS_TOKEN_LEN))
}

/// The three derived columns of a patient row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedFields {
    pub anonymized_name: String,
    pub anonymized_contact: String,
    pub masked_diagnosis: String,
}

/// Masks all three raw fields in one step
///
/// # Errors
///
/// Returns [`ValidationError::MalformedContact`] when the contact string
/// has fewer than four digits.
pub fn mask_fields(
    name: &str,
    contact: &str,
    diagnosis: &str,
) -> Result<MaskedFields, ValidationError> {
    Ok(MaskedFields {
        anonymized_name: mask_name(name),
        anonymized_contact: mask_contact(contact)?,
        masked_diagnosis: mask_diagnosis(diagnosis),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_mask_name_format() {
        let re = Regex::new(r"^ANON_[A-Za-z0-9]+$").unwrap();
        assert!(re.is_match(&mask_name("Jane Doe")));
        assert!(re.is_match(&mask_name("")));
    }

    #[test]
    fn test_mask_name_deterministic() {
        assert_eq!(mask_name("Jane Doe"), mask_name("Jane Doe"));
        assert_ne!(mask_name("Jane Doe"), mask_name("John Doe"));
    }

    #[test]
    fn test_mask_contact_preserves_last_four() {
        assert_eq!(mask_contact("555-123-4567").unwrap(), "XXX-XXX-4567");
        assert_eq!(mask_contact("+1 (800) 555 0199").unwrap(), "XXX-XXX-0199");
        // Exactly four digits is enough
        assert_eq!(mask_contact("1234").unwrap(), "XXX-XXX-1234");
    }

    #[test]
    fn test_mask_contact_rejects_short_input() {
        assert_eq!(mask_contact("123").unwrap_err(), ValidationError::MalformedContact);
        assert_eq!(mask_contact("no digits").unwrap_err(), ValidationError::MalformedContact);
        assert_eq!(mask_contact("").unwrap_err(), ValidationError::MalformedContact);
    }

    #[test]
    fn test_mask_contact_format() {
        let re = Regex::new(r"^XXX-XXX-\d{4}$").unwrap();
        assert!(re.is_match(&mask_contact("555-123-4567").unwrap()));
    }

    #[test]
    fn test_mask_diagnosis_is_one_way_token() {
        let masked = mask_diagnosis("Influenza A");
        assert!(masked.starts_with("MASKED_"));
        assert!(!masked.contains("Influenza"));
        assert_eq!(masked, mask_diagnosis("Influenza A"));
        assert_ne!(masked, mask_diagnosis("Influenza B"));
    }

    #[test]
    fn test_masking_is_idempotent_per_input() {
        // Applying the transform twice to the same raw input yields the
        // same masked output as applying it once.
        let first = mask_name("Jane Doe");
        let second = mask_name("Jane Doe");
        assert_eq!(first, second);

        let first = mask_diagnosis("Flu");
        let second = mask_diagnosis("Flu");
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_inputs_do_not_collide() {
        let names = ["Jane Doe", "John Doe", "Janet Doe", "J. Doe", "jane doe"];
        let tokens: Vec<String> = names.iter().map(|n| mask_name(n)).collect();
        for i in 0..tokens.len() {
            for j in (i + 1)..tokens.len() {
                assert_ne!(tokens[i], tokens[j]);
            }
        }
    }

    #[test]
    fn test_mask_fields_bundles_all_three() {
        let masks = mask_fields("Jane Doe", "555-123-4567", "Flu").unwrap();
        assert_eq!(masks.anonymized_name, mask_name("Jane Doe"));
        assert_eq!(masks.anonymized_contact, "XXX-XXX-4567");
        assert_eq!(masks.masked_diagnosis, mask_diagnosis("Flu"));
    }
}
