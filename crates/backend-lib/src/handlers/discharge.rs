// ============================
// crates/backend-lib/src/handlers/discharge.rs
// ============================
//! Discharge workflow endpoints.
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rehabdesk_common::{DischargeRequest, Patient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct DischargeListQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// Active and discharged patients side by side, as the workflow screen
/// shows them
#[derive(Debug, Serialize)]
pub struct DischargeListResponse {
    pub active: Vec<Patient>,
    pub discharged: Vec<Patient>,
}

/// GET /discharge
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DischargeListQuery>,
) -> Result<Json<DischargeListResponse>, AppError> {
    let mut patients = state.store.list_patients().await?;

    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        let needle = search.to_lowercase();
        patients.retain(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.diagnoses.to_lowercase().contains(&needle)
        });
    }

    let (active, discharged) = patients.into_iter().partition(|p| p.is_active);
    Ok(Json(DischargeListResponse { active, discharged }))
}

/// POST /patients/{id}/discharge
pub async fn discharge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<DischargeRequest>,
) -> Result<Json<Patient>, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "discharge reason must not be empty".to_string(),
        ));
    }

    let patient = state
        .store
        .set_discharge(&id, Some((Utc::now(), request.reason)))
        .await?;
    Ok(Json(patient))
}

/// POST /patients/{id}/reactivate
pub async fn reactivate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, AppError> {
    let patient = state.store.set_discharge(&id, None).await?;
    Ok(Json(patient))
}
