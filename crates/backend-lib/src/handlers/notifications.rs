// ============================
// crates/backend-lib/src/handlers/notifications.rs
// ============================
//! Notification center endpoints, including overdue-payment generation.
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use rehabdesk_common::{Notification, NotificationKind, NotificationPriority};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Days without payment before a notification is raised
const OVERDUE_AFTER_DAYS: i64 = 30;
/// Days without payment before the notification is high priority
const HIGH_PRIORITY_AFTER_DAYS: i64 = 45;

/// Notifications split the way the center renders them
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub unread: Vec<Notification>,
    pub read: Vec<Notification>,
}

/// GET /notifications
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let mut notifications = state.store.list_notifications().await?;
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (unread, read) = notifications.into_iter().partition(|n| !n.is_read);
    Ok(Json(NotificationListResponse { unread, read }))
}

/// POST /notifications/generate
///
/// Scan active patients for overdue payments and raise one unread
/// notification per patient. Patients that already have an unread
/// payment notification are skipped.
pub async fn generate(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let patients = state.store.list_patients().await?;
    let notifications = state.store.list_notifications().await?;

    let now = Utc::now();
    let cutoff = now - Duration::days(OVERDUE_AFTER_DAYS);

    let mut created = 0usize;
    for patient in patients.iter().filter(|p| p.is_active) {
        if patient.last_payment_date >= cutoff {
            continue;
        }

        let already_notified = notifications.iter().any(|n| {
            n.patient_id == patient.id && n.kind == NotificationKind::Payment && !n.is_read
        });
        if already_notified {
            continue;
        }

        let days_since_payment = (now - patient.last_payment_date).num_days();
        let priority = if days_since_payment > HIGH_PRIORITY_AFTER_DAYS {
            NotificationPriority::High
        } else if days_since_payment > OVERDUE_AFTER_DAYS {
            NotificationPriority::Medium
        } else {
            NotificationPriority::Low
        };

        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            patient_id: patient.id.clone(),
            message: format!(
                "{} has an overdue payment ({days_since_payment} days)",
                patient.name
            ),
            kind: NotificationKind::Payment,
            priority,
            is_read: false,
            created_at: now,
        };

        state.store.insert_notification(&notification).await?;
        created += 1;
    }

    Ok(Json(serde_json::json!({ "created": created })))
}

/// POST /notifications/{id}/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.set_notification_read(&id, true).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.mark_all_notifications_read().await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /notifications/{id}
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete_notification(&id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
