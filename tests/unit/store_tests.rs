// ==============================
// tests/unit/store_tests.rs
// ==============================
//! Flat-file row store behavior.
use backend_lib::store::{FlatFileStore, RowStore};
use chrono::{Duration, Utc};
use rehabdesk_common::{
    Notification, NotificationKind, NotificationPriority, Patient, PatientUpdate, PaymentStatus,
};
use tempfile::TempDir;

fn patient(id: &str, active: bool) -> Patient {
    let now = Utc::now();
    Patient {
        id: id.to_string(),
        name: format!("Patient {id}"),
        age: 40,
        contact_number: "0712345678".to_string(),
        registration_date: now,
        diagnoses: "post-op rehabilitation".to_string(),
        treatment: "physiotherapy".to_string(),
        last_payment_date: now - Duration::days(10),
        payment_amount: 150.0,
        payment_status: PaymentStatus::Pending,
        is_active: active,
        discharge_date: None,
        discharge_reason: None,
    }
}

#[tokio::test]
async fn patient_update_touches_only_present_fields() {
    let dir = TempDir::new().unwrap();
    let store = FlatFileStore::new(dir.path()).unwrap();

    store.insert_patient(&patient("p1", true)).await.unwrap();

    let update = PatientUpdate {
        age: Some(41),
        payment_status: Some(PaymentStatus::Paid),
        ..PatientUpdate::default()
    };
    let updated = store.update_patient("p1", &update).await.unwrap();

    assert_eq!(updated.age, 41);
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    // untouched fields survive
    assert_eq!(updated.name, "Patient p1");
    assert_eq!(updated.contact_number, "0712345678");
}

#[tokio::test]
async fn discharge_and_reactivate_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = FlatFileStore::new(dir.path()).unwrap();

    store.insert_patient(&patient("p1", true)).await.unwrap();

    let discharged = store
        .set_discharge("p1", Some((Utc::now(), "treatment complete".to_string())))
        .await
        .unwrap();
    assert!(!discharged.is_active);
    assert!(discharged.discharge_date.is_some());
    assert_eq!(
        discharged.discharge_reason.as_deref(),
        Some("treatment complete")
    );

    let reactivated = store.set_discharge("p1", None).await.unwrap();
    assert!(reactivated.is_active);
    assert!(reactivated.discharge_date.is_none());
    assert!(reactivated.discharge_reason.is_none());
}

#[tokio::test]
async fn recording_a_payment_rolls_the_patient_summary() {
    let dir = TempDir::new().unwrap();
    let store = FlatFileStore::new(dir.path()).unwrap();

    store.insert_patient(&patient("p1", true)).await.unwrap();

    let paid_at = Utc::now();
    store
        .record_patient_payment("p1", paid_at, 300.0)
        .await
        .unwrap();

    let rows = store.list_patients().await.unwrap();
    let row = rows.iter().find(|p| p.id == "p1").unwrap();
    assert_eq!(row.payment_amount, 300.0);
    assert_eq!(row.payment_status, PaymentStatus::Paid);
    assert_eq!(row.last_payment_date, paid_at);
}

#[tokio::test]
async fn notifications_read_flags_and_deletion() {
    let dir = TempDir::new().unwrap();
    let store = FlatFileStore::new(dir.path()).unwrap();

    for id in ["n1", "n2"] {
        store
            .insert_notification(&Notification {
                id: id.to_string(),
                patient_id: "p1".to_string(),
                message: "overdue".to_string(),
                kind: NotificationKind::Payment,
                priority: NotificationPriority::Medium,
                is_read: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    store.set_notification_read("n1", true).await.unwrap();
    let rows = store.list_notifications().await.unwrap();
    assert!(rows.iter().find(|n| n.id == "n1").unwrap().is_read);
    assert!(!rows.iter().find(|n| n.id == "n2").unwrap().is_read);

    store.mark_all_notifications_read().await.unwrap();
    let rows = store.list_notifications().await.unwrap();
    assert!(rows.iter().all(|n| n.is_read));

    store.delete_notification("n1").await.unwrap();
    let rows = store.list_notifications().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "n2");
}

#[tokio::test]
async fn collections_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = FlatFileStore::new(dir.path()).unwrap();
        store.insert_patient(&patient("p1", true)).await.unwrap();
    }

    let store = FlatFileStore::new(dir.path()).unwrap();
    let rows = store.list_patients().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "p1");
}
