// ================
// crates/common/src/lib.rs
// ================
//! Shared record and payload types
//! used between the `RehabDesk` dashboard backend and its clients.
//! Field names follow the row shape of the hosted database, so the same
//! types serialize for both the REST backend and the flat-file store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application role of a user profile
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

/// Application-level user record, keyed by the identity id of the
/// authentication service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// Identity id (matches the auth service's user id)
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    /// Set on each successful login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// OAuth provider the identity authenticated through, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// Payment standing of a patient row
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
}

/// A registered patient
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub contact_number: String,
    pub registration_date: DateTime<Utc>,
    pub diagnoses: String,
    pub treatment: String,
    pub last_payment_date: DateTime<Utc>,
    pub payment_amount: f64,
    pub payment_status: PaymentStatus,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge_reason: Option<String>,
}

/// A logged treatment session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Treatment {
    pub id: String,
    pub patient_id: String,
    pub date: DateTime<Utc>,
    pub treatment_given: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub therapist_name: String,
}

/// How a payment was made
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
}

/// Settlement state of a payment record
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Completed,
    Pending,
    Failed,
}

/// A recorded payment
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: String,
    pub patient_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub status: PaymentState,
}

/// What a notification is about
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Payment,
    Treatment,
    Discharge,
}

/// Urgency of a notification
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

/// A dashboard notification tied to a patient
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub patient_id: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Credentials for password login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for account registration
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Current session summary returned to the client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionInfo {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// True when the profile comes from the local cache rather than the
    /// backend (transient connectivity loss)
    #[serde(default)]
    pub stale: bool,
    /// True for demo-mode sessions fabricated without backend involvement
    #[serde(default)]
    pub demo: bool,
}

/// Fields accepted when registering a new patient
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub contact_number: String,
    pub diagnoses: String,
    pub treatment: String,
    #[serde(default)]
    pub payment_amount: f64,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

/// Partial update of a patient row; absent fields are left untouched
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PatientUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnoses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

/// Fields accepted when logging a treatment
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewTreatment {
    pub patient_id: String,
    pub treatment_given: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub therapist_name: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Fields accepted when recording a payment
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewPayment {
    pub patient_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Payload for the discharge workflow
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DischargeRequest {
    pub reason: String,
}
