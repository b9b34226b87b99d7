// ============================
// crates/backend-lib/src/handlers/patients.rs
// ============================
//! Patient registry endpoints.
use crate::error::AppError;
use crate::validation::{validate_age, validate_amount, validate_contact_number, validate_name};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rehabdesk_common::{NewPatient, Patient, PatientUpdate, PaymentStatus};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Status filter for the registry list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Discharged,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
}

/// GET /patients
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let mut patients = state.store.list_patients().await?;

    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        let needle = search.to_lowercase();
        patients.retain(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.diagnoses.to_lowercase().contains(&needle)
        });
    }

    match query.status {
        StatusFilter::All => {},
        StatusFilter::Active => patients.retain(|p| p.is_active),
        StatusFilter::Discharged => patients.retain(|p| !p.is_active),
    }

    patients.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
    Ok(Json(patients))
}

/// POST /patients
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewPatient>,
) -> Result<Json<Patient>, AppError> {
    validate_name(&request.name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    validate_age(request.age).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    validate_contact_number(&request.contact_number)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    validate_amount(request.payment_amount)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let now = Utc::now();
    let patient = Patient {
        id: Uuid::new_v4().to_string(),
        name: request.name,
        age: request.age,
        contact_number: request.contact_number,
        registration_date: now,
        diagnoses: request.diagnoses,
        treatment: request.treatment,
        last_payment_date: now,
        payment_amount: request.payment_amount,
        payment_status: request.payment_status.unwrap_or(PaymentStatus::Pending),
        is_active: true,
        discharge_date: None,
        discharge_reason: None,
    };

    state.store.insert_patient(&patient).await?;
    Ok(Json(patient))
}

/// PUT /patients/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<PatientUpdate>,
) -> Result<Json<Patient>, AppError> {
    if let Some(name) = &request.name {
        validate_name(name).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    }
    if let Some(age) = request.age {
        validate_age(age).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    }
    if let Some(contact_number) = &request.contact_number {
        validate_contact_number(contact_number)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    }
    if let Some(amount) = request.payment_amount {
        validate_amount(amount).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    }

    let patient = state.store.update_patient(&id, &request).await?;
    Ok(Json(patient))
}
