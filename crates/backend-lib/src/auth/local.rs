// ============================
// crates/backend-lib/src/auth/local.rs
// ============================
//! Flat-file identity provider: the prototype backend.
//!
//! Keeps a local user registry and issues its own sessions, so the
//! dashboard runs with no hosted service at all. Credentials are scrypt
//! hashed; tokens are random, never derived from user data.
use super::password::{hash_password_secure, verify_password};
use super::provider::{AuthEvent, AuthEventKind, Identity, IdentityProvider, OAuthProvider};
use super::token::generate_secure_token;
use super::Session;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{fs as tokio_fs, sync::broadcast, sync::Mutex};
use uuid::Uuid;

/// A locally registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
}

/// Local implementation of [`IdentityProvider`]
pub struct LocalIdentityProvider {
    root: PathBuf,
    session_ttl: Duration,
    events: broadcast::Sender<AuthEvent>,
    // load-modify-save cycles on the json files must not interleave
    write_lock: Mutex<()>,
}

impl LocalIdentityProvider {
    pub fn new<P: AsRef<Path>>(data_dir: P, session_ttl_secs: u64) -> anyhow::Result<Self> {
        let root = data_dir.as_ref().join("auth");
        std::fs::create_dir_all(&root)?;

        let (events, _) = broadcast::channel(16);
        Ok(Self {
            root,
            session_ttl: Duration::seconds(session_ttl_secs as i64),
            events,
            write_lock: Mutex::new(()),
        })
    }

    fn users_path(&self) -> PathBuf {
        self.root.join("users.json")
    }

    fn sessions_path(&self) -> PathBuf {
        self.root.join("sessions.json")
    }

    fn current_path(&self) -> PathBuf {
        self.root.join("current.json")
    }

    async fn load_users(&self) -> Result<Vec<StoredUser>, AppError> {
        load_json(&self.users_path()).await
    }

    async fn load_sessions(&self) -> Result<Vec<Session>, AppError> {
        load_json(&self.sessions_path()).await
    }

    async fn save_users(&self, users: &[StoredUser]) -> Result<(), AppError> {
        save_json(&self.users_path(), users).await
    }

    async fn save_sessions(&self, sessions: &[Session]) -> Result<(), AppError> {
        save_json(&self.sessions_path(), sessions).await
    }

    async fn persist_current(&self, session: Option<&Session>) -> Result<(), AppError> {
        match session {
            Some(session) => save_json(&self.current_path(), session).await,
            None => {
                if self.current_path().exists() {
                    tokio_fs::remove_file(self.current_path()).await?;
                }
                Ok(())
            },
        }
    }

    async fn issue_session(&self, user_id: &str) -> Result<Session, AppError> {
        let session = Session {
            access_token: generate_secure_token(),
            refresh_token: generate_secure_token(),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.session_ttl,
        };

        let mut sessions = self.load_sessions().await?;
        sessions.push(session.clone());
        self.save_sessions(&sessions).await?;
        self.persist_current(Some(&session)).await?;

        Ok(session)
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        let _ = self.events.send(AuthEvent { kind, session });
    }

    fn identity_of(user: &StoredUser) -> Identity {
        Identity {
            id: user.id.clone(),
            email: user.email.clone(),
            name: Some(user.name.clone()),
            provider: Some("email".to_string()),
            email_verified: user.email_verified,
            created_at: Some(user.created_at),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let _guard = self.write_lock.lock().await;

        let users = self.load_users().await?;
        let user = users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| AppError::Auth("unknown email".to_string()))?;

        if !verify_password(&user.password_hash, password) {
            return Err(AppError::Auth("wrong password".to_string()));
        }

        let session = self.issue_session(&user.id).await?;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, AppError> {
        let _guard = self.write_lock.lock().await;

        let mut users = self.load_users().await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let mut plain = password.to_string();
        let password_hash = hash_password_secure(&mut plain)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let user = StoredUser {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash,
            email_verified: false,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        self.save_users(&users).await?;

        let session = self.issue_session(&user.id).await?;
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.load_sessions().await?;
        sessions.retain(|s| s.access_token != access_token);
        self.save_sessions(&sessions).await?;
        self.persist_current(None).await?;

        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }

        let session: Session = load_json_value(&path).await?;
        if session.is_expired() {
            // Expired persisted session: try the refresh path before
            // declaring the operator signed out
            return self.refresh_session(&session.refresh_token).await.map(Some);
        }

        Ok(Some(session))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let _guard = self.write_lock.lock().await;

        let mut sessions = self.load_sessions().await?;
        let Some(index) = sessions.iter().position(|s| s.refresh_token == refresh_token)
        else {
            return Err(AppError::Authorization(
                "refresh token not recognized".to_string(),
            ));
        };

        let user_id = sessions[index].user_id.clone();
        let rotated = Session {
            access_token: generate_secure_token(),
            refresh_token: generate_secure_token(),
            user_id,
            expires_at: Utc::now() + self.session_ttl,
        };
        sessions[index] = rotated.clone();

        self.save_sessions(&sessions).await?;
        self.persist_current(Some(&rotated)).await?;

        self.emit(AuthEventKind::TokenRefreshed, Some(rotated.clone()));
        Ok(rotated)
    }

    fn authorize_url(
        &self,
        _provider: OAuthProvider,
        _redirect_to: &str,
    ) -> Result<String, AppError> {
        Err(AppError::InvalidInput(
            "OAuth sign-in requires the hosted backend".to_string(),
        ))
    }

    async fn identity(&self, access_token: &str) -> Result<Identity, AppError> {
        let sessions = self.load_sessions().await?;
        let session = sessions
            .iter()
            .find(|s| s.access_token == access_token && !s.is_expired())
            .ok_or_else(|| AppError::Authorization("invalid access token".to_string()))?;

        let users = self.load_users().await?;
        let user = users
            .iter()
            .find(|u| u.id == session.user_id)
            .ok_or_else(|| AppError::Authorization("identity no longer exists".to_string()))?;

        Ok(Self::identity_of(user))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

async fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio_fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

async fn load_json_value<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let content = tokio_fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

async fn save_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)?;
    tokio_fs::write(path, json).await?;
    Ok(())
}
