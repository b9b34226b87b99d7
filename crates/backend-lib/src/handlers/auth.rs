// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Login, registration, logout, and session endpoints.
use crate::auth::{client_fingerprint, AuthAction, OAuthProvider};
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::Redirect,
    Json,
};
use rehabdesk_common::{LoginRequest, RegisterRequest, SessionInfo};
use serde::Deserialize;
use std::sync::Arc;

/// Rate-limit identifier for the calling client: hashed user agent plus
/// a coarse time bucket. Not an address and not tamper-proof.
fn caller_key(headers: &HeaderMap) -> String {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");
    client_fingerprint(user_agent)
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionInfo>, AppError> {
    let key = caller_key(&headers);

    if state.auth.login(&request.email, &request.password, &key).await {
        return Ok(Json(state.sessions.info()));
    }

    if state.auth.is_rate_limited(&key, AuthAction::Login) {
        Err(AppError::RateLimited)
    } else {
        Err(AppError::Auth("login rejected".to_string()))
    }
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SessionInfo>, AppError> {
    let key = caller_key(&headers);

    if state
        .auth
        .register(&request.email, &request.password, &request.name, &key)
        .await
    {
        return Ok(Json(state.sessions.info()));
    }

    if state.auth.is_rate_limited(&key, AuthAction::Register) {
        Err(AppError::RateLimited)
    } else {
        Err(AppError::Auth("registration rejected".to_string()))
    }
}

/// POST /logout
pub async fn logout(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let success = state.auth.logout().await;
    Json(serde_json::json!({ "success": success }))
}

/// GET /session
pub async fn session_info(State(state): State<Arc<AppState>>) -> Json<SessionInfo> {
    // Side effect: refreshes a near-expiry session
    state.auth.validate_session().await;
    Json(state.sessions.info())
}

#[derive(Debug, Deserialize)]
pub struct OAuthQuery {
    #[serde(default)]
    redirect_to: Option<String>,
}

/// GET /auth/oauth/{provider}
pub async fn oauth_redirect(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthQuery>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let provider = match provider.as_str() {
        "google" => OAuthProvider::Google,
        "github" => OAuthProvider::Github,
        other => {
            return Err(AppError::InvalidInput(format!(
                "unsupported OAuth provider: {other}"
            )))
        },
    };

    let redirect_to = query
        .redirect_to
        .unwrap_or_else(|| "/dashboard".to_string());
    let key = caller_key(&headers);

    let url = state
        .auth
        .login_with_oauth(provider, &redirect_to, &key)?;
    Ok(Redirect::to(&url))
}
