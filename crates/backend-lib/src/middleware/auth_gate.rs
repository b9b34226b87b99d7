// ============================
// crates/backend-lib/src/middleware/auth_gate.rs
// ============================
//! Authentication gate for the routed dashboard paths.
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Gate a route behind the session check. Browser navigation is sent
/// back to `/login`; API calls get a 401.
///
/// `validate_session` refreshes a near-expiry session as a side effect,
/// so simply browsing the dashboard keeps the session alive.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.auth.validate_session().await {
        return next.run(request).await;
    }

    let wants_html = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));

    if wants_html {
        Redirect::to("/login").into_response()
    } else {
        AppError::Authorization("authentication required".to_string()).into_response()
    }
}
