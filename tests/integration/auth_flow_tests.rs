// =====================================
// tests/integration/auth_flow_tests.rs
// =====================================
//! End-to-end flows through the auth facade: login, demo mode, the
//! refresh threshold, lockout, and registration compensation.
use crate::test_utils::{
    test_app, test_app_with_store, CurrentSessionBehavior, Fault, FaultyStore, MockUser,
};
use backend_lib::store::{FlatFileStore, RowStore};
use chrono::{Duration, Utc};
use rehabdesk_common::Role;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::time::timeout;

const CLIENT: &str = "test-client";

#[tokio::test]
async fn login_resolves_profile_and_fills_the_cache() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));

    assert!(
        app.state
            .auth
            .login("staff@clinic.example", "Password1", CLIENT)
            .await
    );

    let info = app.sessions.info();
    assert!(info.authenticated);
    assert!(!info.demo);
    assert!(!info.stale);
    assert_eq!(info.profile.unwrap().email, "staff@clinic.example");

    let cached = app.cache.profile().expect("profile should be cached");
    assert_eq!(cached.profile.id, "u1");
}

#[tokio::test]
async fn wrong_password_fails_and_is_generic() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));

    assert!(
        !app.state
            .auth
            .login("staff@clinic.example", "wrong", CLIENT)
            .await
    );
    assert!(!app.sessions.info().authenticated);
    assert!(app.cache.profile().is_none());
}

#[tokio::test]
async fn demo_pair_works_with_backend_unreachable() {
    let app = test_app();
    // Nothing registered with the provider, and the backend reads fail
    app.provider
        .set_current_behavior(CurrentSessionBehavior::NetworkError);

    assert!(
        app.state
            .auth
            .login("tajademeh@outlook.com", "admin@123", CLIENT)
            .await
    );

    let info = app.sessions.info();
    assert!(info.authenticated);
    assert!(info.demo);
    let profile = info.profile.unwrap();
    assert_eq!(profile.role, Role::Admin);

    // demo sessions always validate, no refresh traffic
    assert!(app.state.auth.validate_session().await);
    assert_eq!(app.provider.refresh_calls.load(Ordering::SeqCst), 0);

    // and the flag is persisted
    assert!(app.cache.demo_mode());
}

#[tokio::test]
async fn demo_logout_clears_the_flag() {
    let app = test_app();
    assert!(
        app.state
            .auth
            .login("tajademeh@outlook.com", "admin@123", CLIENT)
            .await
    );
    assert!(app.state.auth.logout().await);

    assert!(!app.sessions.info().authenticated);
    assert!(!app.cache.demo_mode());
}

#[tokio::test]
async fn sixth_login_attempt_is_locked_out_even_with_valid_credentials() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));

    for _ in 0..5 {
        assert!(
            !app.state
                .auth
                .login("staff@clinic.example", "wrong", CLIENT)
                .await
        );
    }

    // correct password, but the window is spent
    assert!(
        !app.state
            .auth
            .login("staff@clinic.example", "Password1", CLIENT)
            .await
    );
    assert!(
        app.state
            .auth
            .is_rate_limited(CLIENT, backend_lib::auth::AuthAction::Login)
    );
}

#[tokio::test]
async fn validate_session_refreshes_only_below_the_threshold() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));

    // Plenty of lifetime left: no refresh
    let session = app
        .provider
        .issue_session("u1", Utc::now() + Duration::minutes(30));
    app.sessions.set_session(session);
    assert!(app.state.auth.validate_session().await);
    assert_eq!(app.provider.refresh_calls.load(Ordering::SeqCst), 0);

    // Three minutes left: refresh fires
    let session = app
        .provider
        .issue_session("u1", Utc::now() + Duration::minutes(3));
    app.sessions.set_session(session);
    assert!(app.state.auth.validate_session().await);
    assert_eq!(app.provider.refresh_calls.load(Ordering::SeqCst), 1);

    // The renewed session is long-lived again: no further refresh
    assert!(app.state.auth.validate_session().await);
    assert_eq!(app.provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn denied_refresh_is_a_full_logout() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));
    assert!(
        app.state
            .auth
            .login("staff@clinic.example", "Password1", CLIENT)
            .await
    );

    let session = app
        .provider
        .issue_session("u1", Utc::now() + Duration::minutes(2));
    app.sessions.set_session(session);
    app.provider.fail_refresh.store(true, Ordering::SeqCst);

    assert!(!app.state.auth.validate_session().await);
    assert!(app.sessions.session().is_none());
    assert!(!app.sessions.info().authenticated);
    assert!(app.cache.profile().is_none());
}

#[tokio::test]
async fn registration_creates_identity_and_profile() {
    let app = test_app();

    let registered = timeout(
        std::time::Duration::from_secs(5),
        app.state
            .auth
            .register("new@clinic.example", "Password1", "New Staff", CLIENT),
    )
    .await
    .expect("register timed out");
    assert!(registered);

    let info = app.sessions.info();
    assert!(info.authenticated);
    let profile = info.profile.unwrap();
    assert_eq!(profile.email, "new@clinic.example");
    assert_eq!(profile.name, "New Staff");
    assert_eq!(profile.role, Role::Staff);
}

#[tokio::test]
async fn registration_rejects_weak_input_before_the_backend() {
    let app = test_app();

    assert!(
        !app.state
            .auth
            .register("not-an-email", "Password1", "X", CLIENT)
            .await
    );
    assert!(
        !app.state
            .auth
            .register("ok@clinic.example", "short", "X", CLIENT)
            .await
    );
    // no identity was created for either
    assert!(
        !app.state
            .auth
            .login("ok@clinic.example", "short", "other-client")
            .await
    );
}

#[tokio::test]
async fn failed_profile_insert_compensates_with_sign_out() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FaultyStore::new(
        FlatFileStore::new(dir.path().join("data")).unwrap(),
    ));
    *store.fail_insert_profile.lock().unwrap() = Some(Fault::Internal);

    let app = test_app_with_store(dir, store.clone() as Arc<dyn RowStore>);

    let registered = timeout(
        std::time::Duration::from_secs(5),
        app.state
            .auth
            .register("new@clinic.example", "Password1", "New Staff", CLIENT),
    )
    .await
    .expect("register timed out");

    assert!(!registered);
    // the half-created identity was signed back out
    assert!(app.provider.sign_out_calls.load(Ordering::SeqCst) >= 1);
    assert!(app.sessions.session().is_none());
    assert!(!app.sessions.info().authenticated);
    // and no profile row exists
    assert!(store.profile_by_id("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn oauth_redirect_is_rate_limited() {
    let app = test_app();

    for _ in 0..3 {
        assert!(app
            .state
            .auth
            .login_with_oauth(
                backend_lib::auth::OAuthProvider::Google,
                "/dashboard",
                CLIENT
            )
            .is_ok());
    }

    let err = app
        .state
        .auth
        .login_with_oauth(
            backend_lib::auth::OAuthProvider::Google,
            "/dashboard",
            CLIENT,
        )
        .unwrap_err();
    assert!(matches!(err, backend_lib::error::AppError::RateLimited));
}

#[tokio::test]
async fn logout_tells_the_backend_once() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));
    assert!(
        app.state
            .auth
            .login("staff@clinic.example", "Password1", CLIENT)
            .await
    );

    assert!(app.state.auth.logout().await);
    assert_eq!(app.provider.sign_out_calls.load(Ordering::SeqCst), 1);
    assert!(app.sessions.session().is_none());

    // logging out again is a no-op backend-wise
    assert!(app.state.auth.logout().await);
    assert_eq!(app.provider.sign_out_calls.load(Ordering::SeqCst), 1);
}
