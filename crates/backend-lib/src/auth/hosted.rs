// ============================
// crates/backend-lib/src/auth/hosted.rs
// ============================
//! Identity provider backed by the hosted auth service's REST surface.
use super::provider::{AuthEvent, AuthEventKind, Identity, IdentityProvider, OAuthProvider};
use super::Session;
use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::{fs as tokio_fs, sync::broadcast, sync::Mutex};

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: ApiUser,
}

/// User object returned by the auth service
#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
    #[serde(default)]
    app_metadata: Option<serde_json::Value>,
}

impl ApiUser {
    fn into_identity(self) -> Identity {
        let name = self
            .user_metadata
            .as_ref()
            .and_then(|m| m.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let provider = self
            .app_metadata
            .as_ref()
            .and_then(|m| m.get("provider"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Identity {
            id: self.id,
            email: self.email.unwrap_or_default(),
            name,
            provider,
            email_verified: self.email_confirmed_at.is_some(),
            created_at: self.created_at,
        }
    }
}

/// Error body shape of the auth service
#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Hosted implementation of [`IdentityProvider`]
pub struct HostedIdentityProvider {
    http: reqwest::Client,
    base: String,
    anon_key: String,
    /// Where the operator's current session is mirrored between runs
    session_path: PathBuf,
    events: broadcast::Sender<AuthEvent>,
    write_lock: Mutex<()>,
}

impl HostedIdentityProvider {
    pub fn new<P: AsRef<Path>>(
        base: impl Into<String>,
        anon_key: impl Into<String>,
        data_dir: P,
    ) -> anyhow::Result<Self> {
        let dir = data_dir.as_ref().join("auth");
        std::fs::create_dir_all(&dir)?;

        let (events, _) = broadcast::channel(16);
        Ok(Self {
            http: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            session_path: dir.join("session.json"),
            events,
            write_lock: Mutex::new(()),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base)
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        let _ = self.events.send(AuthEvent { kind, session });
    }

    async fn persist_session(&self, session: Option<&Session>) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        match session {
            Some(session) => {
                let json = serde_json::to_string_pretty(session)?;
                tokio_fs::write(&self.session_path, json).await?;
            },
            None => {
                if self.session_path.exists() {
                    tokio_fs::remove_file(&self.session_path).await?;
                }
            },
        }
        Ok(())
    }

    async fn load_persisted(&self) -> Result<Option<Session>, AppError> {
        if !self.session_path.exists() {
            return Ok(None);
        }
        let content = tokio_fs::read_to_string(&self.session_path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn session_from(&self, token: TokenResponse) -> Session {
        let expires_at = token
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .or_else(|| {
                token
                    .expires_in
                    .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
            })
            .or_else(|| jwt_expiry(&token.access_token))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));

        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: token.user.id,
            expires_at,
        }
    }
}

/// Classify a non-success auth response; `invalid_grant` is what the
/// token endpoint answers for bad credentials or a dead refresh token.
async fn auth_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<AuthErrorBody> = serde_json::from_str(&body).ok();
    let message = parsed
        .and_then(|b| b.msg.or(b.error_description).or(b.error))
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Authorization(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            AppError::Network(message)
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            if message.to_lowercase().contains("already") {
                AppError::Conflict(message)
            } else {
                AppError::Auth(message)
            }
        },
        _ => AppError::Internal(format!("auth service returned {status}: {message}")),
    }
}

/// Best-effort expiry from the `exp` claim of a JWT access token
fn jwt_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let payload = access_token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let session = self.session_from(response.json::<TokenResponse>().await?);
        self.persist_session(Some(&session)).await?;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, AppError> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "name": name },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        // With email confirmations enabled the service returns a user but
        // no session; the dashboard cannot proceed without one.
        let body: serde_json::Value = response.json().await?;
        if body.get("access_token").is_none() {
            return Err(AppError::Auth(
                "email confirmation required before sign-in".to_string(),
            ));
        }

        let token: TokenResponse = serde_json::from_value(body)?;
        let session = self.session_from(token);
        self.persist_session(Some(&session)).await?;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        // An already-dead token still means "signed out" locally
        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            return Err(auth_error(response).await);
        }

        self.persist_session(None).await?;
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        let Some(session) = self.load_persisted().await? else {
            return Ok(None);
        };

        if session.is_expired() {
            return self.refresh_session(&session.refresh_token).await.map(Some);
        }

        // Validate the mirrored session against the service
        match self.identity(&session.access_token).await {
            Ok(_) => Ok(Some(session)),
            Err(AppError::Authorization(_)) => {
                // Token revoked server-side; a refresh is the last resort
                match self.refresh_session(&session.refresh_token).await {
                    Ok(refreshed) => Ok(Some(refreshed)),
                    Err(err) => Err(err),
                }
            },
            Err(err) => Err(err),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            // A denied refresh means the session is gone for good
            let err = auth_error(response).await;
            return Err(match err {
                AppError::Auth(msg) => AppError::Authorization(msg),
                other => other,
            });
        }

        let session = self.session_from(response.json::<TokenResponse>().await?);
        self.persist_session(Some(&session)).await?;
        self.emit(AuthEventKind::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, AppError> {
        Ok(format!(
            "{}?provider={provider}&redirect_to={redirect_to}",
            self.auth_url("authorize")
        ))
    }

    async fn identity(&self, access_token: &str) -> Result<Identity, AppError> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(auth_error(response).await);
        }

        let user: ApiUser = response.json().await?;
        Ok(user.into_identity())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
