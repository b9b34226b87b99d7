// ============================
// crates/backend-lib/src/router.rs
// ============================
//! Route table for the dashboard backend.
use crate::handlers;
use crate::middleware::require_auth;
use crate::AppState;
use axum::{
    middleware,
    response::Redirect,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
///
/// `/login`, `/register`, and the OAuth redirect are reachable without a
/// session; every other routed path sits behind the auth gate and sends
/// unauthenticated browsers back to `/login`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register))
        .route("/auth/oauth/{provider}", get(handlers::auth::oauth_redirect));

    let protected = Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/logout", post(handlers::auth::logout))
        .route("/session", get(handlers::auth::session_info))
        .route("/dashboard", get(handlers::dashboard::stats))
        .route(
            "/patients",
            get(handlers::patients::list).post(handlers::patients::create),
        )
        .route("/patients/{id}", put(handlers::patients::update))
        .route("/patients/{id}/discharge", post(handlers::discharge::discharge))
        .route("/patients/{id}/reactivate", post(handlers::discharge::reactivate))
        .route(
            "/treatments",
            get(handlers::treatments::list).post(handlers::treatments::create),
        )
        .route(
            "/payments",
            get(handlers::payments::list).post(handlers::payments::create),
        )
        .route("/notifications", get(handlers::notifications::list))
        .route("/notifications/generate", post(handlers::notifications::generate))
        .route("/notifications/read-all", post(handlers::notifications::mark_all_read))
        .route("/notifications/{id}/read", post(handlers::notifications::mark_read))
        .route("/notifications/{id}", delete(handlers::notifications::remove))
        .route("/discharge", get(handlers::discharge::list))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
