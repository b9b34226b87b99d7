// ============================
// crates/backend-lib/src/handlers/payments.rs
// ============================
//! Payment tracking endpoints.
use crate::error::AppError;
use crate::validation::validate_amount;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use rehabdesk_common::{NewPayment, Payment, PaymentState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    #[serde(default)]
    pub search: Option<String>,
}

/// A payment annotated with the patient's display name
#[derive(Debug, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub patient_name: String,
}

/// Payment list plus the revenue totals shown above it
#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentView>,
    pub total_revenue: f64,
    pub month_revenue: f64,
}

/// GET /payments
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let patients = state.store.list_patients().await?;
    let mut payments = state.store.list_payments().await?;

    let names: HashMap<&str, &str> = patients
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    let name_of = |patient_id: &str| {
        names
            .get(patient_id)
            .map_or("Unknown patient", |name| *name)
    };

    let now = Utc::now();
    let total_revenue: f64 = payments
        .iter()
        .filter(|p| p.status == PaymentState::Completed)
        .map(|p| p.amount)
        .sum();
    let month_revenue: f64 = payments
        .iter()
        .filter(|p| {
            p.status == PaymentState::Completed
                && p.date.year() == now.year()
                && p.date.month() == now.month()
        })
        .map(|p| p.amount)
        .sum();

    if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
        let needle = search.to_lowercase();
        payments.retain(|p| name_of(&p.patient_id).to_lowercase().contains(&needle));
    }

    payments.sort_by(|a, b| b.date.cmp(&a.date));

    let payments = payments
        .into_iter()
        .map(|payment| {
            let patient_name = name_of(&payment.patient_id).to_string();
            PaymentView {
                payment,
                patient_name,
            }
        })
        .collect();

    Ok(Json(PaymentListResponse {
        payments,
        total_revenue,
        month_revenue,
    }))
}

/// POST /payments
///
/// Recording a payment also rolls the patient row's payment summary
/// (last payment date, amount, `paid` status).
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewPayment>,
) -> Result<Json<Payment>, AppError> {
    validate_amount(request.amount).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    if request.amount == 0.0 {
        return Err(AppError::InvalidInput(
            "payment amount must be positive".to_string(),
        ));
    }

    let patients = state.store.list_patients().await?;
    if !patients.iter().any(|p| p.id == request.patient_id) {
        return Err(AppError::NotFound(format!(
            "patient {}",
            request.patient_id
        )));
    }

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        patient_id: request.patient_id.clone(),
        amount: request.amount,
        date: request.date.unwrap_or_else(Utc::now),
        method: request.method,
        status: PaymentState::Completed,
    };

    state.store.insert_payment(&payment).await?;
    state
        .store
        .record_patient_payment(&request.patient_id, payment.date, payment.amount)
        .await?;

    Ok(Json(payment))
}
