// ============================
// crates/backend-lib/src/auth/resolver.rs
// ============================
//! Maps an authenticated identity to an application profile.
//!
//! Resolution is idempotent under races: the store's uniqueness
//! constraint plus the retry-read on conflict guarantee at most one
//! profile row per identity, with one caller observing `Created` and the
//! rest observing `Fetched`.
use super::provider::{Identity, IdentityProvider};
use super::Session;
use crate::error::AppError;
use crate::store::RowStore;
use chrono::Utc;
use metrics::counter;
use rehabdesk_common::{Role, UserProfile};
use std::sync::Arc;

/// How a resolution attempt produced its profile
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedProfile {
    /// Row already existed (including fetched-after-collision)
    Fetched(UserProfile),
    /// This caller inserted the row
    Created(UserProfile),
    /// Store is incompatible; profile derived from identity data only and
    /// never persisted
    Synthesized(UserProfile),
}

impl ResolvedProfile {
    pub fn profile(&self) -> &UserProfile {
        match self {
            ResolvedProfile::Fetched(p)
            | ResolvedProfile::Created(p)
            | ResolvedProfile::Synthesized(p) => p,
        }
    }

    pub fn into_profile(self) -> UserProfile {
        match self {
            ResolvedProfile::Fetched(p)
            | ResolvedProfile::Created(p)
            | ResolvedProfile::Synthesized(p) => p,
        }
    }

    /// Synthesized profiles must not be written to the local cache
    pub fn is_synthesized(&self) -> bool {
        matches!(self, ResolvedProfile::Synthesized(_))
    }
}

/// Resolves identities to profiles, creating rows lazily
pub struct ProfileResolver {
    store: Arc<dyn RowStore>,
    provider: Arc<dyn IdentityProvider>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn RowStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { store, provider }
    }

    /// Resolve the profile for the session's identity.
    ///
    /// Error contract: `Authorization` means the session cannot be
    /// trusted and must be torn down by the caller; `Network` means the
    /// caller may fall back to cached state; everything else is surfaced
    /// as-is.
    pub async fn resolve(&self, session: &Session) -> Result<ResolvedProfile, AppError> {
        match self.store.profile_by_id(&session.user_id).await {
            Ok(Some(profile)) => Ok(ResolvedProfile::Fetched(
                self.annotate(profile, session).await,
            )),
            Ok(None) => self.create(session).await,
            Err(AppError::Schema(msg)) => {
                tracing::warn!(%msg, "profile store incompatible, synthesizing profile");
                let identity = self.provider.identity(&session.access_token).await?;
                counter!(crate::metrics::PROFILE_SYNTHESIZED).increment(1);
                Ok(ResolvedProfile::Synthesized(synthesize(&identity)))
            },
            Err(err) => Err(err),
        }
    }

    /// Step 3 of resolution: no row exists yet, create one
    async fn create(&self, session: &Session) -> Result<ResolvedProfile, AppError> {
        let identity = self.provider.identity(&session.access_token).await?;

        // The very first OAuth registration of an admin-less installation
        // becomes the admin; everyone else is staff.
        let role = if identity.is_oauth() {
            match self.store.count_admins().await {
                Ok(0) => Role::Admin,
                Ok(_) => Role::Staff,
                Err(AppError::Schema(msg)) => {
                    tracing::warn!(%msg, "cannot count admins, synthesizing profile");
                    counter!(crate::metrics::PROFILE_SYNTHESIZED).increment(1);
                    return Ok(ResolvedProfile::Synthesized(synthesize(&identity)));
                },
                Err(err) => return Err(err),
            }
        } else {
            Role::Staff
        };

        let profile = UserProfile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: identity
                .name
                .clone()
                .unwrap_or_else(|| identity.email.clone()),
            role,
            created_at: Utc::now(),
            last_login_at: Some(Utc::now()),
            oauth_provider: identity.provider.clone().filter(|p| p != "email"),
            email_verified: Some(identity.email_verified),
        };

        match self.store.insert_profile(&profile).await {
            Ok(()) => {
                counter!(crate::metrics::PROFILE_CREATED).increment(1);
                Ok(ResolvedProfile::Created(profile))
            },
            Err(AppError::Conflict(_)) => {
                // Another caller created the row first; read theirs
                match self.store.profile_by_id(&session.user_id).await? {
                    Some(existing) => Ok(ResolvedProfile::Fetched(existing)),
                    None => Err(AppError::Internal(
                        "profile vanished after insert conflict".to_string(),
                    )),
                }
            },
            Err(AppError::Schema(msg)) => {
                tracing::warn!(%msg, "profile insert hit schema mismatch, synthesizing");
                counter!(crate::metrics::PROFILE_SYNTHESIZED).increment(1);
                Ok(ResolvedProfile::Synthesized(synthesize(&identity)))
            },
            Err(err) => Err(err),
        }
    }

    /// Step 2 annotation: enrich an existing row with best-effort
    /// OAuth/verification metadata and stamp the login time. Failures
    /// here never fail the resolution.
    async fn annotate(&self, mut profile: UserProfile, session: &Session) -> UserProfile {
        if let Ok(identity) = self.provider.identity(&session.access_token).await {
            if profile.oauth_provider.is_none() {
                profile.oauth_provider = identity.provider.clone().filter(|p| p != "email");
            }
            if profile.email_verified.is_none() {
                profile.email_verified = Some(identity.email_verified);
            }
        }

        let now = Utc::now();
        if let Err(err) = self.store.touch_last_login(&profile.id, now).await {
            tracing::debug!(%err, "could not record last login");
        } else {
            profile.last_login_at = Some(now);
        }

        profile
    }
}

/// Profile derived purely from identity-service data; never persisted
fn synthesize(identity: &Identity) -> UserProfile {
    UserProfile {
        id: identity.id.clone(),
        email: identity.email.clone(),
        name: identity
            .name
            .clone()
            .unwrap_or_else(|| identity.email.clone()),
        role: Role::Staff,
        created_at: identity.created_at.unwrap_or_else(Utc::now),
        last_login_at: Some(Utc::now()),
        oauth_provider: identity.provider.clone().filter(|p| p != "email"),
        email_verified: Some(identity.email_verified),
    }
}
