// ============================
// crates/backend-lib/src/auth/provider.rs
// ============================
//! The seam to the external authentication service.
use super::Session;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Kind of a session-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// Emitted once after the initial session read at process start
    Initial,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A session-change notification from the auth service
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

/// Supported OAuth redirect providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    Github,
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuthProvider::Google => write!(f, "google"),
            OAuthProvider::Github => write!(f, "github"),
        }
    }
}

/// The auth service's record of "who is logged in", distinct from the
/// application profile
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
    /// Display name from signup metadata, when present
    pub name: Option<String>,
    /// Authentication path: "email" or an OAuth provider name
    pub provider: Option<String>,
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Whether this identity authenticated through an OAuth provider
    /// rather than email/password
    pub fn is_oauth(&self) -> bool {
        self.provider.as_deref().is_some_and(|p| p != "email")
    }
}

/// Operations the external auth service exposes.
///
/// Two implementations exist: [`crate::auth::HostedIdentityProvider`]
/// (the hosted service) and [`crate::auth::LocalIdentityProvider`] (the
/// flat-file prototype). Both persist the operator's current session so
/// it survives a restart, and both publish session-change events on a
/// broadcast channel.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError>;

    async fn sign_up(&self, email: &str, password: &str, name: &str)
        -> Result<Session, AppError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;

    /// Read back the persisted session, validating it against the service.
    /// `Ok(None)` means genuinely signed out; network-class errors are
    /// surfaced so the caller can fall back to cached state.
    async fn current_session(&self) -> Result<Option<Session>, AppError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError>;

    /// Build the OAuth redirect URL for the given provider
    fn authorize_url(&self, provider: OAuthProvider, redirect_to: &str)
        -> Result<String, AppError>;

    /// Fetch the identity owning the given access token
    async fn identity(&self, access_token: &str) -> Result<Identity, AppError>;

    /// Subscribe to session-change notifications
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
