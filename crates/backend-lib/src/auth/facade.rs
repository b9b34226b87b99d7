// ============================
// crates/backend-lib/src/auth/facade.rs
// ============================
//! The authentication entry point for the rest of the application.
//!
//! Every error class is resolved here to the simple contract the UI
//! lives on: booleans and profile-or-nothing. No raw error crosses this
//! boundary; failures surface as generic messages at the HTTP layer.
use super::cache::LocalCache;
use super::password::{validate_password_strength, PasswordRequirements};
use super::provider::{IdentityProvider, OAuthProvider};
use super::rate_limit::{AuthAction, AuthRateLimiter};
use super::resolver::ProfileResolver;
use super::session::{SessionState, REFRESH_THRESHOLD};
use crate::config::DemoSettings;
use crate::error::AppError;
use crate::validation::validate_email;
use chrono::Utc;
use metrics::counter;
use rehabdesk_common::{Role, UserProfile};
use std::sync::Arc;
use std::time::Duration;

/// Wait between identity creation and profile insertion, covering the
/// hosted service's eventual-consistency lag. Not a correctness
/// guarantee; the conflict retry in the resolver remains the backstop.
const REGISTER_SETTLE_DELAY: Duration = Duration::from_millis(400);

/// Composes the credential, profile, session, and rate-limit machinery
pub struct AuthFacade {
    provider: Arc<dyn IdentityProvider>,
    resolver: Arc<ProfileResolver>,
    state: Arc<SessionState>,
    cache: Arc<LocalCache>,
    rate_limiter: AuthRateLimiter,
    demo: DemoSettings,
}

impl AuthFacade {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        resolver: Arc<ProfileResolver>,
        state: Arc<SessionState>,
        cache: Arc<LocalCache>,
        rate_limiter: AuthRateLimiter,
        demo: DemoSettings,
    ) -> Self {
        Self {
            provider,
            resolver,
            state,
            cache,
            rate_limiter,
            demo,
        }
    }

    pub fn session_state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Whether the caller is currently locked out of the given action.
    /// Used by the HTTP layer to choose between "Invalid email or
    /// password" and "Too many attempts".
    pub fn is_rate_limited(&self, client_key: &str, action: AuthAction) -> bool {
        self.rate_limiter.is_limited(client_key, action)
    }

    /// Password login. `client_key` identifies the caller for rate
    /// limiting (a fingerprint, not an address).
    pub async fn login(&self, email: &str, password: &str, client_key: &str) -> bool {
        // The demo pair never touches the backend, by design usable when
        // the service is down entirely.
        if self.demo.enabled && email == self.demo.email && password == self.demo.password {
            counter!(crate::metrics::AUTH_DEMO_LOGIN).increment(1);
            tracing::info!("demo-mode login");
            self.state.set_demo(demo_profile(&self.demo));
            if let Err(err) = self.cache.set_demo_mode(true) {
                tracing::warn!(%err, "failed to persist demo flag");
            }
            return true;
        }

        if !self.rate_limiter.check(client_key, AuthAction::Login) {
            return false;
        }

        let session = match self.provider.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(err) => {
                tracing::info!(%err, "login rejected");
                counter!(crate::metrics::AUTH_LOGIN_FAILED).increment(1);
                self.rate_limiter.record_failure(client_key, AuthAction::Login);
                return false;
            },
        };

        self.state.set_session(session.clone());

        match self.resolver.resolve(&session).await {
            Ok(resolved) => {
                let synthesized = resolved.is_synthesized();
                let profile = resolved.into_profile();
                self.state.set_profile(profile.clone(), false);
                if !synthesized {
                    if let Err(err) = self.cache.store_profile(&profile) {
                        tracing::warn!(%err, "failed to cache profile");
                    }
                }
                self.rate_limiter.record_success(client_key, AuthAction::Login);
                counter!(crate::metrics::AUTH_LOGIN).increment(1);
                true
            },
            Err(AppError::Authorization(msg)) => {
                // The session the service just handed us does not hold up;
                // treat it as fatal for this login.
                tracing::warn!(%msg, "session invalidated during profile resolution");
                let _ = self.provider.sign_out(&session.access_token).await;
                self.state.clear();
                false
            },
            Err(err) => {
                tracing::warn!(%err, "profile resolution failed after login");
                self.state.clear();
                false
            },
        }
    }

    /// OAuth login: hands back the redirect URL for the chosen provider.
    /// The session itself arrives later through the event stream.
    pub fn login_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        client_key: &str,
    ) -> Result<String, AppError> {
        if !self.rate_limiter.check(client_key, AuthAction::OAuth) {
            return Err(AppError::RateLimited);
        }

        self.provider.authorize_url(provider, redirect_to)
    }

    /// Sign the operator out. Always succeeds locally, even when the
    /// backend cannot be told.
    pub async fn logout(&self) -> bool {
        counter!(crate::metrics::AUTH_LOGOUT).increment(1);

        if !self.state.is_demo() {
            if let Some(session) = self.state.session() {
                if let Err(err) = self.provider.sign_out(&session.access_token).await {
                    tracing::warn!(%err, "backend sign-out failed, clearing locally");
                }
            }
        }

        self.state.clear();
        if let Err(err) = self.cache.clear_profile() {
            tracing::warn!(%err, "failed to clear cached profile");
        }
        if let Err(err) = self.cache.set_demo_mode(false) {
            tracing::warn!(%err, "failed to clear demo flag");
        }
        true
    }

    /// Create the identity, then the profile. If the profile cannot be
    /// created the half-registered identity is signed back out —
    /// best-effort compensation, not a transaction.
    pub async fn register(&self, email: &str, password: &str, name: &str, client_key: &str) -> bool {
        if validate_email(email).is_err() {
            return false;
        }
        if !validate_password_strength(password, &PasswordRequirements::default()) {
            return false;
        }

        if !self.rate_limiter.check(client_key, AuthAction::Register) {
            return false;
        }

        let session = match self.provider.sign_up(email, password, name).await {
            Ok(session) => session,
            Err(err) => {
                tracing::info!(%err, "registration rejected");
                self.rate_limiter.record_failure(client_key, AuthAction::Register);
                return false;
            },
        };

        self.state.set_session(session.clone());

        // Give the service time to propagate the new identity before the
        // profile row references it.
        tokio::time::sleep(REGISTER_SETTLE_DELAY).await;

        match self.resolver.resolve(&session).await {
            Ok(resolved) => {
                let synthesized = resolved.is_synthesized();
                let profile = resolved.into_profile();
                self.state.set_profile(profile.clone(), false);
                if !synthesized {
                    if let Err(err) = self.cache.store_profile(&profile) {
                        tracing::warn!(%err, "failed to cache profile");
                    }
                }
                counter!(crate::metrics::AUTH_REGISTER).increment(1);
                true
            },
            Err(err) => {
                tracing::warn!(%err, "profile creation failed, undoing registration");
                if let Err(err) = self.provider.sign_out(&session.access_token).await {
                    tracing::warn!(%err, "compensating sign-out failed");
                }
                self.state.clear();
                if let Err(err) = self.cache.clear_profile() {
                    tracing::warn!(%err, "failed to clear cached profile");
                }
                false
            },
        }
    }

    /// Check the current session, proactively refreshing it when its
    /// remaining lifetime drops below the threshold.
    pub async fn validate_session(&self) -> bool {
        if self.state.is_demo() {
            return true;
        }

        let Some(session) = self.state.session() else {
            // Operating on the cached profile after a network-degraded
            // startup: keep the dashboard usable
            return self.state.has_stale_profile();
        };

        if session.expires_within(REFRESH_THRESHOLD) {
            return self.refresh().await;
        }

        true
    }

    /// Renew the session. A denied refresh means the session state
    /// cannot be trusted any more, so failure is a full logout.
    pub async fn refresh(&self) -> bool {
        let Some(session) = self.state.session() else {
            return false;
        };

        match self.provider.refresh_session(&session.refresh_token).await {
            Ok(renewed) => {
                counter!(crate::metrics::SESSION_REFRESHED).increment(1);
                self.state.set_session(renewed.clone());

                match self.resolver.resolve(&renewed).await {
                    Ok(resolved) => {
                        let synthesized = resolved.is_synthesized();
                        let profile = resolved.into_profile();
                        self.state.set_profile(profile.clone(), false);
                        if !synthesized {
                            if let Err(err) = self.cache.store_profile(&profile) {
                                tracing::warn!(%err, "failed to cache profile");
                            }
                        }
                    },
                    Err(err) => {
                        tracing::warn!(%err, "profile re-resolution after refresh failed");
                    },
                }
                true
            },
            Err(err) => {
                tracing::info!(%err, "session refresh denied, logging out");
                counter!(crate::metrics::SESSION_REFRESH_FAILED).increment(1);
                self.logout().await;
                false
            },
        }
    }
}

/// The fabricated admin profile behind the demo credential pair
fn demo_profile(demo: &DemoSettings) -> UserProfile {
    UserProfile {
        id: "demo-admin".to_string(),
        email: demo.email.clone(),
        name: "Demo Administrator".to_string(),
        role: Role::Admin,
        created_at: Utc::now(),
        last_login_at: Some(Utc::now()),
        oauth_provider: None,
        email_verified: Some(true),
    }
}
