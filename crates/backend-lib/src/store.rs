// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Row storage abstraction with flat-file implementation.
//!
//! The hosted service exposes the same operations over REST (see
//! [`crate::rest`]); the flat-file store is the prototype backend that
//! keeps every collection as a JSON file under the data directory.
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rehabdesk_common::{
    Notification, Patient, PatientUpdate, Payment, PaymentStatus, Role, Treatment, UserProfile,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::{fs as tokio_fs, sync::Mutex};

/// Trait for row storage backends
#[async_trait]
pub trait RowStore: Send + Sync {
    // --- profiles ---

    /// Fetch a user profile by identity id
    async fn profile_by_id(&self, id: &str) -> Result<Option<UserProfile>, AppError>;

    /// Insert a new user profile; fails with [`AppError::Conflict`] when a
    /// row with the same id already exists
    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), AppError>;

    /// Count profiles holding the admin role
    async fn count_admins(&self) -> Result<usize, AppError>;

    /// Record a successful login on the profile row (best-effort metadata)
    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    // --- patients ---

    async fn list_patients(&self) -> Result<Vec<Patient>, AppError>;

    async fn insert_patient(&self, patient: &Patient) -> Result<(), AppError>;

    async fn update_patient(
        &self,
        id: &str,
        update: &PatientUpdate,
    ) -> Result<Patient, AppError>;

    /// Set or clear the discharge fields of a patient row.
    /// `Some((date, reason))` discharges, `None` reactivates.
    async fn set_discharge(
        &self,
        id: &str,
        discharge: Option<(DateTime<Utc>, String)>,
    ) -> Result<Patient, AppError>;

    /// Roll the payment summary fields of a patient row after a payment
    async fn record_patient_payment(
        &self,
        id: &str,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Result<(), AppError>;

    // --- treatments ---

    async fn list_treatments(&self) -> Result<Vec<Treatment>, AppError>;

    async fn insert_treatment(&self, treatment: &Treatment) -> Result<(), AppError>;

    // --- payments ---

    async fn list_payments(&self) -> Result<Vec<Payment>, AppError>;

    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError>;

    // --- notifications ---

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;

    async fn set_notification_read(&self, id: &str, read: bool) -> Result<(), AppError>;

    async fn mark_all_notifications_read(&self) -> Result<(), AppError>;

    async fn delete_notification(&self, id: &str) -> Result<(), AppError>;
}

/// Flat-file implementation of the `RowStore` trait
pub struct FlatFileStore {
    root: PathBuf,
    // Writers load-modify-save whole collections; serialize them.
    write_lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().join("records");
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, AppError> {
        let path = self.collection_path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio_fs::read_to_string(&path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<T> = serde_json::from_str(&content)?;
        Ok(rows)
    }

    async fn save<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), AppError> {
        let path = self.collection_path(name);
        let json = serde_json::to_string_pretty(rows)?;
        tokio_fs::write(&path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl RowStore for FlatFileStore {
    async fn profile_by_id(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        let profiles: Vec<UserProfile> = self.load("users").await?;
        Ok(profiles.into_iter().find(|p| p.id == id))
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut profiles: Vec<UserProfile> = self.load("users").await?;

        if profiles.iter().any(|p| p.id == profile.id) {
            return Err(AppError::Conflict(format!(
                "profile {} already exists",
                profile.id
            )));
        }

        profiles.push(profile.clone());
        self.save("users", &profiles).await
    }

    async fn count_admins(&self) -> Result<usize, AppError> {
        let profiles: Vec<UserProfile> = self.load("users").await?;
        Ok(profiles.iter().filter(|p| p.role == Role::Admin).count())
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut profiles: Vec<UserProfile> = self.load("users").await?;

        let Some(profile) = profiles.iter_mut().find(|p| p.id == id) else {
            return Err(AppError::NotFound(format!("profile {id}")));
        };
        profile.last_login_at = Some(at);

        self.save("users", &profiles).await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, AppError> {
        self.load("patients").await
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut patients: Vec<Patient> = self.load("patients").await?;

        if patients.iter().any(|p| p.id == patient.id) {
            return Err(AppError::Conflict(format!(
                "patient {} already exists",
                patient.id
            )));
        }

        patients.push(patient.clone());
        self.save("patients", &patients).await
    }

    async fn update_patient(
        &self,
        id: &str,
        update: &PatientUpdate,
    ) -> Result<Patient, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut patients: Vec<Patient> = self.load("patients").await?;

        let Some(patient) = patients.iter_mut().find(|p| p.id == id) else {
            return Err(AppError::NotFound(format!("patient {id}")));
        };

        if let Some(name) = &update.name {
            patient.name = name.clone();
        }
        if let Some(age) = update.age {
            patient.age = age;
        }
        if let Some(contact_number) = &update.contact_number {
            patient.contact_number = contact_number.clone();
        }
        if let Some(diagnoses) = &update.diagnoses {
            patient.diagnoses = diagnoses.clone();
        }
        if let Some(treatment) = &update.treatment {
            patient.treatment = treatment.clone();
        }
        if let Some(payment_amount) = update.payment_amount {
            patient.payment_amount = payment_amount;
        }
        if let Some(payment_status) = update.payment_status {
            patient.payment_status = payment_status;
        }

        let updated = patient.clone();
        self.save("patients", &patients).await?;
        Ok(updated)
    }

    async fn set_discharge(
        &self,
        id: &str,
        discharge: Option<(DateTime<Utc>, String)>,
    ) -> Result<Patient, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut patients: Vec<Patient> = self.load("patients").await?;

        let Some(patient) = patients.iter_mut().find(|p| p.id == id) else {
            return Err(AppError::NotFound(format!("patient {id}")));
        };

        match discharge {
            Some((date, reason)) => {
                patient.is_active = false;
                patient.discharge_date = Some(date);
                patient.discharge_reason = Some(reason);
            },
            None => {
                patient.is_active = true;
                patient.discharge_date = None;
                patient.discharge_reason = None;
            },
        }

        let updated = patient.clone();
        self.save("patients", &patients).await?;
        Ok(updated)
    }

    async fn record_patient_payment(
        &self,
        id: &str,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut patients: Vec<Patient> = self.load("patients").await?;

        let Some(patient) = patients.iter_mut().find(|p| p.id == id) else {
            return Err(AppError::NotFound(format!("patient {id}")));
        };

        patient.last_payment_date = date;
        patient.payment_amount = amount;
        patient.payment_status = PaymentStatus::Paid;

        self.save("patients", &patients).await
    }

    async fn list_treatments(&self) -> Result<Vec<Treatment>, AppError> {
        self.load("treatments").await
    }

    async fn insert_treatment(&self, treatment: &Treatment) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut treatments: Vec<Treatment> = self.load("treatments").await?;
        treatments.push(treatment.clone());
        self.save("treatments", &treatments).await
    }

    async fn list_payments(&self) -> Result<Vec<Payment>, AppError> {
        self.load("payments").await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut payments: Vec<Payment> = self.load("payments").await?;
        payments.push(payment.clone());
        self.save("payments", &payments).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.load("notifications").await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut notifications: Vec<Notification> = self.load("notifications").await?;
        notifications.push(notification.clone());
        self.save("notifications", &notifications).await
    }

    async fn set_notification_read(&self, id: &str, read: bool) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut notifications: Vec<Notification> = self.load("notifications").await?;

        let Some(notification) = notifications.iter_mut().find(|n| n.id == id) else {
            return Err(AppError::NotFound(format!("notification {id}")));
        };
        notification.is_read = read;

        self.save("notifications", &notifications).await
    }

    async fn mark_all_notifications_read(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut notifications: Vec<Notification> = self.load("notifications").await?;
        for notification in &mut notifications {
            notification.is_read = true;
        }
        self.save("notifications", &notifications).await
    }

    async fn delete_notification(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut notifications: Vec<Notification> = self.load("notifications").await?;
        let before = notifications.len();
        notifications.retain(|n| n.id != id);

        if notifications.len() == before {
            return Err(AppError::NotFound(format!("notification {id}")));
        }

        self.save("notifications", &notifications).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehabdesk_common::Role;

    fn profile(id: &str, role: Role) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{id}@clinic.example"),
            name: format!("User {id}"),
            role,
            created_at: Utc::now(),
            last_login_at: None,
            oauth_provider: None,
            email_verified: None,
        }
    }

    #[tokio::test]
    async fn duplicate_profile_insert_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store.insert_profile(&profile("u1", Role::Staff)).await.unwrap();
        let err = store
            .insert_profile(&profile("u1", Role::Staff))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // the stored row is unchanged
        let row = store.profile_by_id("u1").await.unwrap().unwrap();
        assert_eq!(row.email, "u1@clinic.example");
    }

    #[tokio::test]
    async fn count_admins_only_counts_admins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        assert_eq!(store.count_admins().await.unwrap(), 0);
        store.insert_profile(&profile("a", Role::Admin)).await.unwrap();
        store.insert_profile(&profile("s", Role::Staff)).await.unwrap();
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }
}
