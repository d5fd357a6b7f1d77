//! Deterministic field-level anonymization
//!
//! Pure transforms from confidential patient field values to masked
//! representations. Masking is irreversible: name and diagnosis tokens
//! are truncated digests, and the contact mask keeps only the last four
//! digits. Reversible encryption is deliberately out of scope; adding it
//! would require a separate key-management component.

pub mod engine;

pub use engine::{mask_contact, mask_diagnosis, mask_fields, mask_name, MaskedFields};
