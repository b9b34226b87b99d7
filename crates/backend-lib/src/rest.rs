// ============================
// crates/backend-lib/src/rest.rs
// ============================
//! REST implementation of [`crate::store::RowStore`] against the hosted
//! database service.
//!
//! Responses come back as `{data, error}`-shaped rows; errors are
//! classified into the taxonomy of [`crate::error::AppError`] so callers
//! can match on the handling class instead of inspecting status codes.
use crate::error::AppError;
use crate::store::RowStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rehabdesk_common::{
    Notification, Patient, PatientUpdate, Payment, PaymentStatus, Treatment, UserProfile,
};
use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

/// Postgres unique-violation SQLSTATE
const PG_UNIQUE_VIOLATION: &str = "23505";
/// Postgres undefined-table / undefined-column SQLSTATEs
const PG_UNDEFINED_TABLE: &str = "42P01";
const PG_UNDEFINED_COLUMN: &str = "42703";

/// Error body shape returned by the row API
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Shared slot holding the operator's access token. The session state
/// writes it, the row client reads it on every request.
pub type BearerSlot = Arc<RwLock<Option<String>>>;

/// REST row store talking to the hosted service
pub struct RestRowStore {
    http: reqwest::Client,
    base: String,
    anon_key: String,
    bearer: BearerSlot,
}

impl RestRowStore {
    pub fn new(base: impl Into<String>, anon_key: impl Into<String>, bearer: BearerSlot) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            bearer,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .bearer
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        req.header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .authorize(self.http.get(self.table_url(table)))
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await?;

        let response = check_response(response).await?;
        let rows = response.json::<Vec<T>>().await?;
        Ok(rows)
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<(), AppError> {
        let response = self
            .authorize(self.http.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    async fn update_by_id<T: Serialize + Sync>(
        &self,
        table: &str,
        id: &str,
        patch: &T,
    ) -> Result<(), AppError> {
        let response = self
            .authorize(self.http.patch(self.table_url(table)))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let filter = format!("eq.{id}");
        let mut rows: Vec<T> = self.select(table, &[("id", filter.as_str())]).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

/// Classify a non-success response into the error taxonomy
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: Option<RestErrorBody> = serde_json::from_str(&body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.as_deref()).unwrap_or("");
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or(body);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Authorization(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        _ if code == PG_UNIQUE_VIOLATION => AppError::Conflict(message),
        _ if code == PG_UNDEFINED_TABLE
            || code == PG_UNDEFINED_COLUMN
            || code.starts_with("PGRST") =>
        {
            AppError::Schema(message)
        },
        StatusCode::NOT_FOUND => AppError::Schema(message),
        _ => AppError::Internal(format!("row API returned {status}: {message}")),
    })
}

#[async_trait]
impl RowStore for RestRowStore {
    async fn profile_by_id(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        self.fetch_by_id("users", id).await
    }

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.insert("users", profile).await
    }

    async fn count_admins(&self) -> Result<usize, AppError> {
        let admins: Vec<serde_json::Value> = self
            .select("users", &[("role", "eq.admin")])
            .await?;
        Ok(admins.len())
    }

    async fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        self.update_by_id("users", id, &serde_json::json!({ "last_login_at": at }))
            .await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, AppError> {
        self.select("patients", &[("order", "registration_date.desc")])
            .await
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<(), AppError> {
        self.insert("patients", patient).await
    }

    async fn update_patient(
        &self,
        id: &str,
        update: &PatientUpdate,
    ) -> Result<Patient, AppError> {
        self.update_by_id("patients", id, update).await?;
        self.fetch_by_id("patients", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("patient {id}")))
    }

    async fn set_discharge(
        &self,
        id: &str,
        discharge: Option<(DateTime<Utc>, String)>,
    ) -> Result<Patient, AppError> {
        let patch = match discharge {
            Some((date, reason)) => serde_json::json!({
                "is_active": false,
                "discharge_date": date,
                "discharge_reason": reason,
            }),
            None => serde_json::json!({
                "is_active": true,
                "discharge_date": null,
                "discharge_reason": null,
            }),
        };

        self.update_by_id("patients", id, &patch).await?;
        self.fetch_by_id("patients", id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("patient {id}")))
    }

    async fn record_patient_payment(
        &self,
        id: &str,
        date: DateTime<Utc>,
        amount: f64,
    ) -> Result<(), AppError> {
        self.update_by_id(
            "patients",
            id,
            &serde_json::json!({
                "last_payment_date": date,
                "payment_amount": amount,
                "payment_status": PaymentStatus::Paid,
            }),
        )
        .await
    }

    async fn list_treatments(&self) -> Result<Vec<Treatment>, AppError> {
        self.select("treatments", &[("order", "date.desc")]).await
    }

    async fn insert_treatment(&self, treatment: &Treatment) -> Result<(), AppError> {
        self.insert("treatments", treatment).await
    }

    async fn list_payments(&self) -> Result<Vec<Payment>, AppError> {
        self.select("payments", &[("order", "date.desc")]).await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), AppError> {
        self.insert("payments", payment).await
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.select("notifications", &[("order", "created_at.desc")])
            .await
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.insert("notifications", notification).await
    }

    async fn set_notification_read(&self, id: &str, read: bool) -> Result<(), AppError> {
        self.update_by_id("notifications", id, &serde_json::json!({ "is_read": read }))
            .await
    }

    async fn mark_all_notifications_read(&self) -> Result<(), AppError> {
        let response = self
            .authorize(self.http.patch(self.table_url("notifications")))
            .query(&[("is_read", "eq.false")])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "is_read": true }))
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> Result<(), AppError> {
        let response = self
            .authorize(self.http.delete(self.table_url("notifications")))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;

        check_response(response).await?;
        Ok(())
    }
}
