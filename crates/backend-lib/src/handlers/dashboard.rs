// ============================
// crates/backend-lib/src/handlers/dashboard.rs
// ============================
//! Dashboard summary endpoint.
use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, Json};
use chrono::{Datelike, Duration, Utc};
use rehabdesk_common::{Patient, PaymentState, PaymentStatus};
use serde::Serialize;
use std::sync::Arc;

/// Aggregated numbers shown on the dashboard landing page
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_patients: usize,
    pub active_patients: usize,
    pub discharged_patients: usize,
    /// Completed payments in the current calendar month
    pub monthly_revenue: f64,
    /// Active patients whose last payment is over 30 days old and not
    /// settled
    pub pending_payments: usize,
    pub monthly_treatments: usize,
    /// Five most recent registrations
    pub recent_patients: Vec<Patient>,
}

/// GET /dashboard
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>, AppError> {
    let patients = state.store.list_patients().await?;
    let payments = state.store.list_payments().await?;
    let treatments = state.store.list_treatments().await?;

    let now = Utc::now();
    let active = patients.iter().filter(|p| p.is_active).count();
    let discharged = patients.len() - active;

    let monthly_revenue: f64 = payments
        .iter()
        .filter(|p| {
            p.status == PaymentState::Completed
                && p.date.year() == now.year()
                && p.date.month() == now.month()
        })
        .map(|p| p.amount)
        .sum();

    let thirty_days_ago = now - Duration::days(30);
    let pending_payments = patients
        .iter()
        .filter(|p| {
            p.is_active
                && p.last_payment_date < thirty_days_ago
                && p.payment_status != PaymentStatus::Paid
        })
        .count();

    let monthly_treatments = treatments
        .iter()
        .filter(|t| t.date.year() == now.year() && t.date.month() == now.month())
        .count();

    let mut recent_patients = patients.clone();
    recent_patients.sort_by(|a, b| b.registration_date.cmp(&a.registration_date));
    recent_patients.truncate(5);

    Ok(Json(DashboardStats {
        total_patients: patients.len(),
        active_patients: active,
        discharged_patients: discharged,
        monthly_revenue,
        pending_payments,
        monthly_treatments,
        recent_patients,
    }))
}
