//! Patient record model and role-filtered views
//!
//! The invariant here is that the three masked columns are always a pure
//! function of the raw columns. [`PatientWrite`] is the only way to
//! construct a row write, and it computes the masks itself, so no code
//! path can persist raw fields with stale masks.

use crate::anonymization::{mask_fields, MaskedFields};
use crate::domain::errors::ValidationError;
use crate::domain::ids::PatientId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The confidential raw fields supplied by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPatientFields {
    pub name: String,
    pub contact: String,
    pub diagnosis: String,
}

/// A validated raw+masked write, the single entry point for patient
/// mutations
///
/// Constructing a `PatientWrite` validates the raw fields and derives all
/// three masked counterparts in one step. Repositories accept only this
/// type for create and update, so a raw field can never be written
/// without its recomputed mask.
#[derive(Debug, Clone)]
pub struct PatientWrite {
    raw: RawPatientFields,
    masks: MaskedFields,
}

impl PatientWrite {
    /// Validates the raw fields and computes their masked counterparts
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for empty fields and
    /// [`ValidationError::MalformedContact`] when the contact string has
    /// fewer than four digits.
    pub fn new(raw: RawPatientFields) -> Result<Self, ValidationError> {
        if raw.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if raw.contact.trim().is_empty() {
            return Err(ValidationError::MissingField("contact"));
        }
        if raw.diagnosis.trim().is_empty() {
            return Err(ValidationError::MissingField("diagnosis"));
        }

        let masks = mask_fields(&raw.name, &raw.contact, &raw.diagnosis)?;
        Ok(Self { raw, masks })
    }

    /// The validated raw fields
    pub fn raw(&self) -> &RawPatientFields {
        &self.raw
    }

    /// The masked fields derived from the raw fields
    pub fn masks(&self) -> &MaskedFields {
        &self.masks
    }
}

/// A stored patient record, raw and masked fields together
///
/// Only the storage layer and the service façade handle this type; it is
/// filtered down to a [`PatientView`] before anything leaves the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub contact: String,
    pub diagnosis: String,
    pub anonymized_name: String,
    pub anonymized_contact: String,
    pub masked_diagnosis: String,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A role-filtered projection of a patient record
///
/// Raw fields are `None` for every role except admin; the struct is what
/// `list_patients` and `export_patients` hand back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientView {
    pub id: PatientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    pub anonymized_name: String,
    pub anonymized_contact: String,
    pub masked_diagnosis: String,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PatientView {
    /// Full projection: raw and masked fields (admin)
    pub fn raw_and_masked(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: Some(patient.name.clone()),
            contact: Some(patient.contact.clone()),
            diagnosis: Some(patient.diagnosis.clone()),
            anonymized_name: patient.anonymized_name.clone(),
            anonymized_contact: patient.anonymized_contact.clone(),
            masked_diagnosis: patient.masked_diagnosis.clone(),
            date_added: patient.date_added,
            last_updated: patient.last_updated,
        }
    }

    /// Masked-only projection (doctor)
    pub fn masked_only(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: None,
            contact: None,
            diagnosis: None,
            anonymized_name: patient.anonymized_name.clone(),
            anonymized_contact: patient.anonymized_contact.clone(),
            masked_diagnosis: patient.masked_diagnosis.clone(),
            date_added: patient.date_added,
            last_updated: patient.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawPatientFields {
        RawPatientFields {
            name: "Jane Doe".to_string(),
            contact: "555-123-4567".to_string(),
            diagnosis: "Flu".to_string(),
        }
    }

    #[test]
    fn test_patient_write_computes_masks() {
        let write = PatientWrite::new(raw()).unwrap();
        assert!(write.masks().anonymized_name.starts_with("ANON_"));
        assert_eq!(write.masks().anonymized_contact, "XXX-XXX-4567");
        assert!(write.masks().masked_diagnosis.starts_with("MASKED_"));
    }

    #[test]
    fn test_patient_write_rejects_empty_fields() {
        let mut fields = raw();
        fields.name = "  ".to_string();
        assert_eq!(
            PatientWrite::new(fields).unwrap_err(),
            ValidationError::MissingField("name")
        );

        let mut fields = raw();
        fields.diagnosis = String::new();
        assert_eq!(
            PatientWrite::new(fields).unwrap_err(),
            ValidationError::MissingField("diagnosis")
        );
    }

    #[test]
    fn test_patient_write_rejects_short_contact() {
        let mut fields = raw();
        fields.contact = "call me".to_string();
        assert_eq!(
            PatientWrite::new(fields).unwrap_err(),
            ValidationError::MalformedContact
        );
    }

    #[test]
    fn test_masked_view_omits_raw_fields() {
        let write = PatientWrite::new(raw()).unwrap();
        let patient = Patient {
            id: PatientId::new(1),
            name: write.raw().name.clone(),
            contact: write.raw().contact.clone(),
            diagnosis: write.raw().diagnosis.clone(),
            anonymized_name: write.masks().anonymized_name.clone(),
            anonymized_contact: write.masks().anonymized_contact.clone(),
            masked_diagnosis: write.masks().masked_diagnosis.clone(),
            date_added: Utc::now(),
            last_updated: Utc::now(),
        };

        let view = PatientView::masked_only(&patient);
        assert!(view.name.is_none());
        assert!(view.contact.is_none());
        assert!(view.diagnosis.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("Jane Doe"));
        assert!(!json.contains("555-123-4567"));
        assert!(!json.contains("Flu"));
    }
}
