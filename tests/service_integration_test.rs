//! End-to-end tests for the access-controlled service façade
//!
//! Each test stands up a throwaway SQLite database, seeds the three
//! standard accounts, and drives the service through the public API the
//! way a UI layer would.

use medgate::auth::hash_password;
use medgate::domain::{
    LogAction, MedgateError, PatientId, RawPatientFields, Role, ValidationError,
};
use medgate::service::PatientService;
use medgate::storage::{AuditLog, SqliteStore, UserStore};
use regex::Regex;
use std::sync::Arc;
use tempfile::TempDir;

const ADMIN_PASSWORD: &str = "AdminPass123!";
const DOCTOR_PASSWORD: &str = "DoctorPass123!";
const RECEPTION_PASSWORD: &str = "ReceptionPass123!";

async fn setup() -> (TempDir, Arc<SqliteStore>, PatientService) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("medgate.db");
    let store = Arc::new(SqliteStore::connect(&path, 2).await.expect("open store"));

    for (username, password, role) in [
        ("admin", ADMIN_PASSWORD, Role::Admin),
        ("doctor", DOCTOR_PASSWORD, Role::Doctor),
        ("reception", RECEPTION_PASSWORD, Role::Receptionist),
    ] {
        store
            .insert_if_absent(username, &hash_password(password), role)
            .await
            .expect("seed user");
    }

    let service = PatientService::with_sqlite(store.clone());
    (dir, store, service)
}

fn jane() -> RawPatientFields {
    RawPatientFields {
        name: "Jane Doe".to_string(),
        contact: "555-123-4567".to_string(),
        diagnosis: "Flu".to_string(),
    }
}

#[tokio::test]
async fn receptionist_adds_admin_anonymizes() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let patient_id = service.add_patient(&reception, jane()).await.unwrap();

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    service.trigger_anonymize_all(&admin).await.unwrap();

    let patients = service.list_patients(&admin).await.unwrap();
    let row = patients.iter().find(|p| p.id == patient_id).unwrap();

    let anon_name_re = Regex::new(r"^ANON_[A-Za-z0-9]+$").unwrap();
    assert!(anon_name_re.is_match(&row.anonymized_name));
    assert_eq!(row.anonymized_contact, "XXX-XXX-4567");
    assert!(row.masked_diagnosis.starts_with("MASKED_"));

    let logs = store.list_all().await.unwrap();
    assert!(logs.iter().any(|e| e.action == LogAction::Anonymize));
}

#[tokio::test]
async fn doctor_edit_is_denied_and_audited() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let patient_id = service.add_patient(&reception, jane()).await.unwrap();

    let doctor = service.login("doctor", DOCTOR_PASSWORD).await.unwrap();
    let doctor_id = store
        .find_by_username("doctor")
        .await
        .unwrap()
        .unwrap()
        .id;

    let err = service
        .edit_patient(&doctor, patient_id, jane())
        .await
        .unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));

    let logs = store.list_all().await.unwrap();
    let last = logs.last().unwrap();
    assert_eq!(last.action, LogAction::Denied);
    assert_eq!(last.user_id, doctor_id);
    assert_eq!(last.role, Role::Doctor);
}

#[tokio::test]
async fn three_failed_logins_produce_three_entries() {
    let (_dir, store, service) = setup().await;

    let mut messages = Vec::new();
    for _ in 0..3 {
        let err = service.login("doctor", "wrong password").await.unwrap_err();
        assert!(matches!(err, MedgateError::Auth(_)));
        messages.push(err.to_string());
    }

    // Unknown user yields the byte-identical error
    let unknown = service.login("nobody", "wrong password").await.unwrap_err();
    assert!(matches!(unknown, MedgateError::Auth(_)));
    assert_eq!(unknown.to_string(), messages[0]);

    let failed: Vec<_> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.action == LogAction::LoginFailed)
        .collect();
    assert_eq!(failed.len(), 3);
}

#[tokio::test]
async fn doctor_views_never_contain_raw_values() {
    let (_dir, _store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    service.add_patient(&reception, jane()).await.unwrap();

    let doctor = service.login("doctor", DOCTOR_PASSWORD).await.unwrap();
    let views = service.list_patients(&doctor).await.unwrap();
    assert_eq!(views.len(), 1);

    let view = &views[0];
    assert!(view.name.is_none());
    assert!(view.contact.is_none());
    assert!(view.diagnosis.is_none());

    let json = serde_json::to_string(&views).unwrap();
    assert!(!json.contains("Jane Doe"));
    assert!(!json.contains("555-123-4567"));
    assert!(!json.contains("Flu"));
}

#[tokio::test]
async fn admin_views_include_raw_and_masked() {
    let (_dir, _store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let id = service.add_patient(&reception, jane()).await.unwrap();

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let view = service.get_patient(&admin, id).await.unwrap();
    assert_eq!(view.name.as_deref(), Some("Jane Doe"));
    assert_eq!(view.contact.as_deref(), Some("555-123-4567"));
    assert_eq!(view.diagnosis.as_deref(), Some("Flu"));
    assert_eq!(view.anonymized_contact, "XXX-XXX-4567");
}

#[tokio::test]
async fn receptionist_cannot_view_patients() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let err = service.list_patients(&reception).await.unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));

    let logs = store.list_all().await.unwrap();
    assert_eq!(logs.last().unwrap().action, LogAction::Denied);
}

#[tokio::test]
async fn every_call_appends_exactly_one_entry() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let baseline = store.list_all().await.unwrap().len();

    // Allowed mutation
    let id = service.add_patient(&reception, jane()).await.unwrap();
    assert_eq!(store.list_all().await.unwrap().len(), baseline + 1);

    // Allowed read
    service.list_patients(&admin).await.unwrap();
    assert_eq!(store.list_all().await.unwrap().len(), baseline + 2);

    // Denied call
    service.export_patients(&reception).await.unwrap_err();
    assert_eq!(store.list_all().await.unwrap().len(), baseline + 3);

    // Validation failure after allow
    let mut bad = jane();
    bad.contact = "n/a".to_string();
    let err = service.edit_patient(&reception, id, bad).await.unwrap_err();
    assert!(matches!(
        err,
        MedgateError::Validation(ValidationError::MalformedContact)
    ));
    assert_eq!(store.list_all().await.unwrap().len(), baseline + 4);
}

#[tokio::test]
async fn edit_recomputes_masks_with_raw_fields() {
    let (_dir, _store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let id = service.add_patient(&reception, jane()).await.unwrap();

    let updated = RawPatientFields {
        name: "Janet Doe".to_string(),
        contact: "555-987-0001".to_string(),
        diagnosis: "Recovered".to_string(),
    };
    service.edit_patient(&reception, id, updated).await.unwrap();

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let view = service.get_patient(&admin, id).await.unwrap();
    assert_eq!(view.name.as_deref(), Some("Janet Doe"));
    assert_eq!(view.anonymized_contact, "XXX-XXX-0001");
    assert_ne!(view.anonymized_name, medgate::anonymization::mask_name("Jane Doe"));
    assert_eq!(view.anonymized_name, medgate::anonymization::mask_name("Janet Doe"));
}

#[tokio::test]
async fn edit_unknown_patient_is_a_validation_error() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let before = store.list_all().await.unwrap().len();

    let err = service
        .edit_patient(&reception, PatientId::new(404), jane())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MedgateError::Validation(ValidationError::UnknownPatient(_))
    ));
    assert_eq!(store.list_all().await.unwrap().len(), before + 1);
}

#[tokio::test]
async fn audit_log_access_is_admin_only() {
    let (_dir, _store, service) = setup().await;

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let doctor = service.login("doctor", DOCTOR_PASSWORD).await.unwrap();

    let logs = service.list_logs(&admin).await.unwrap();
    assert!(logs.iter().any(|e| e.action == LogAction::Login));

    let err = service.list_logs(&doctor).await.unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));
    let err = service.export_logs(&doctor).await.unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));
}

#[tokio::test]
async fn export_patients_logs_an_export_entry() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    service.add_patient(&reception, jane()).await.unwrap();

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let rows = service.export_patients(&admin).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].name.is_some());

    let logs = store.list_all().await.unwrap();
    let last = logs.last().unwrap();
    assert_eq!(last.action, LogAction::Export);
    assert_eq!(last.details["target"], "patients");
}

#[tokio::test]
async fn admin_deletes_patient_and_it_is_audited() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let id = service.add_patient(&reception, jane()).await.unwrap();

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    service.delete_patient(&admin, id).await.unwrap();

    let logs = store.list_all().await.unwrap();
    let last = logs.last().unwrap();
    assert_eq!(last.action, LogAction::Update);
    assert_eq!(last.details["op"], "delete_patient");
    assert_eq!(last.details["patient_id"], id.as_i64());

    let err = service.get_patient(&admin, id).await.unwrap_err();
    assert!(matches!(
        err,
        MedgateError::Validation(ValidationError::UnknownPatient(_))
    ));
}

#[tokio::test]
async fn only_admin_can_delete_patients() {
    let (_dir, store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    let id = service.add_patient(&reception, jane()).await.unwrap();

    let doctor = service.login("doctor", DOCTOR_PASSWORD).await.unwrap();
    let err = service.delete_patient(&doctor, id).await.unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));

    let err = service.delete_patient(&reception, id).await.unwrap_err();
    assert!(matches!(err, MedgateError::Authorization(_)));

    let logs = store.list_all().await.unwrap();
    assert_eq!(logs.last().unwrap().action, LogAction::Denied);

    // The record survived both attempts
    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    assert!(service.get_patient(&admin, id).await.is_ok());
}

#[tokio::test]
async fn delete_unknown_patient_is_a_validation_error() {
    let (_dir, store, service) = setup().await;

    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let before = store.list_all().await.unwrap().len();

    let err = service
        .delete_patient(&admin, PatientId::new(404))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MedgateError::Validation(ValidationError::UnknownPatient(_))
    ));
    assert_eq!(store.list_all().await.unwrap().len(), before + 1);
}

#[tokio::test]
async fn anonymize_reports_zero_when_masks_are_current() {
    let (_dir, _store, service) = setup().await;

    let reception = service.login("reception", RECEPTION_PASSWORD).await.unwrap();
    service.add_patient(&reception, jane()).await.unwrap();

    // Masks are derived at write time, so a fresh dataset needs no work
    let admin = service.login("admin", ADMIN_PASSWORD).await.unwrap();
    let updated = service.trigger_anonymize_all(&admin).await.unwrap();
    assert_eq!(updated, 0);
}
