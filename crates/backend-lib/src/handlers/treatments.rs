// ============================
// crates/backend-lib/src/handlers/treatments.rs
// ============================
//! Treatment logging endpoints.
use crate::error::AppError;
use crate::validation::validate_name;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use rehabdesk_common::{NewTreatment, Treatment};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Number of entries shown when no patient is selected
const RECENT_TREATMENTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct TreatmentListQuery {
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// GET /treatments
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TreatmentListQuery>,
) -> Result<Json<Vec<Treatment>>, AppError> {
    let mut treatments = state.store.list_treatments().await?;
    treatments.sort_by(|a, b| b.date.cmp(&a.date));

    match query.patient_id {
        Some(patient_id) => {
            treatments.retain(|t| t.patient_id == patient_id);
        },
        None => treatments.truncate(RECENT_TREATMENTS),
    }

    Ok(Json(treatments))
}

/// POST /treatments
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewTreatment>,
) -> Result<Json<Treatment>, AppError> {
    if request.treatment_given.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "treatment description must not be empty".to_string(),
        ));
    }
    validate_name(&request.therapist_name)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    // The referenced patient must exist
    let patients = state.store.list_patients().await?;
    if !patients.iter().any(|p| p.id == request.patient_id) {
        return Err(AppError::NotFound(format!(
            "patient {}",
            request.patient_id
        )));
    }

    let treatment = Treatment {
        id: Uuid::new_v4().to_string(),
        patient_id: request.patient_id,
        date: request.date.unwrap_or_else(Utc::now),
        treatment_given: request.treatment_given,
        notes: request.notes,
        therapist_name: request.therapist_name,
    };

    state.store.insert_treatment(&treatment).await?;
    Ok(Json(treatment))
}
