// ==========================================
// tests/integration/session_monitor_tests.rs
// ==========================================
//! Session monitor behavior: initial-load degradation and reaction to
//! session-change events.
use crate::test_utils::{test_app, wait_until, CurrentSessionBehavior, MockUser};
use backend_lib::auth::AuthEventKind;
use chrono::{Duration, Utc};
use rehabdesk_common::{Role, UserProfile};

fn cached_profile() -> UserProfile {
    UserProfile {
        id: "u1".to_string(),
        email: "staff@clinic.example".to_string(),
        name: "Cached Staff".to_string(),
        role: Role::Staff,
        created_at: Utc::now(),
        last_login_at: None,
        oauth_provider: None,
        email_verified: Some(true),
    }
}

#[tokio::test]
async fn network_failure_at_startup_falls_back_to_the_cache() {
    let app = test_app();
    app.cache.store_profile(&cached_profile()).unwrap();
    app.provider
        .set_current_behavior(CurrentSessionBehavior::NetworkError);

    app.state.monitor().initialize().await;

    let info = app.sessions.info();
    assert!(info.authenticated, "cached profile keeps the UI usable");
    assert!(info.stale, "the profile must be marked stale");
    assert_eq!(info.profile.unwrap().name, "Cached Staff");

    // the gate stays open in degraded mode
    assert!(app.state.auth.validate_session().await);
}

#[tokio::test]
async fn network_failure_without_a_cache_means_logged_out() {
    let app = test_app();
    app.provider
        .set_current_behavior(CurrentSessionBehavior::NetworkError);

    app.state.monitor().initialize().await;

    assert!(!app.sessions.info().authenticated);
}

#[tokio::test]
async fn authorization_failure_at_startup_clears_the_cache() {
    let app = test_app();
    app.cache.store_profile(&cached_profile()).unwrap();
    app.provider
        .set_current_behavior(CurrentSessionBehavior::AuthError);

    app.state.monitor().initialize().await;

    let info = app.sessions.info();
    assert!(!info.authenticated);
    assert!(info.profile.is_none());
    assert!(app.cache.profile().is_none(), "stale cache must not survive");
}

#[tokio::test]
async fn live_session_at_startup_resolves_the_profile() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));
    app.provider
        .issue_session("u1", Utc::now() + Duration::hours(1));
    app.provider
        .set_current_behavior(CurrentSessionBehavior::Persisted);

    app.state.monitor().initialize().await;

    let info = app.sessions.info();
    assert!(info.authenticated);
    assert!(!info.stale);
    assert_eq!(info.profile.unwrap().id, "u1");
    assert!(app.cache.profile().is_some());
}

#[tokio::test]
async fn signed_out_event_clears_state_and_cache() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "Password1"));
    assert!(
        app.state
            .auth
            .login("staff@clinic.example", "Password1", "client")
            .await
    );
    assert!(app.cache.profile().is_some());

    let handle = app.state.monitor().spawn();

    app.provider.emit(AuthEventKind::SignedOut, None);
    assert!(
        wait_until(|| app.sessions.profile().is_none(), 2000).await,
        "profile should clear after the sign-out event"
    );
    assert!(app.cache.profile().is_none());

    handle.shutdown();
}

#[tokio::test]
async fn sign_in_event_resolves_and_caches() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));

    let handle = app.state.monitor().spawn();

    let session = app
        .provider
        .issue_session("u1", Utc::now() + Duration::hours(1));
    app.provider.emit(AuthEventKind::SignedIn, Some(session));

    assert!(
        wait_until(|| app.sessions.profile().is_some(), 2000).await,
        "profile should be resolved after the sign-in event"
    );
    assert_eq!(app.sessions.profile().unwrap().id, "u1");
    assert!(app.cache.profile().is_some());

    handle.shutdown();
}

#[tokio::test]
async fn token_refresh_event_keeps_the_profile_current() {
    let app = test_app();
    app.provider
        .add_user(MockUser::email_user("u1", "staff@clinic.example", "pw"));

    let handle = app.state.monitor().spawn();

    let session = app
        .provider
        .issue_session("u1", Utc::now() + Duration::hours(1));
    app.provider
        .emit(AuthEventKind::TokenRefreshed, Some(session.clone()));

    assert!(
        wait_until(
            || app.sessions.session().map(|s| s.access_token.clone())
                == Some(session.access_token.clone()),
            2000
        )
        .await,
        "the refreshed session should be mirrored"
    );

    handle.shutdown();
}
