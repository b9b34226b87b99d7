// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the `RehabDesk` clinic dashboard.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rest;
pub mod router;
pub mod store;
pub mod validation;

use crate::auth::{
    AuthFacade, AuthRateLimiter, HostedIdentityProvider, IdentityProvider, LocalCache,
    LocalIdentityProvider, ProfileResolver, SessionMonitor, SessionState,
};
use crate::config::{BackendMode, Settings};
use crate::rest::RestRowStore;
use crate::store::{FlatFileStore, RowStore};
use anyhow::Context;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication facade
    pub auth: Arc<AuthFacade>,
    /// Session state
    pub sessions: Arc<SessionState>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Row storage backend
    pub store: Arc<dyn RowStore>,
    provider: Arc<dyn IdentityProvider>,
    resolver: Arc<ProfileResolver>,
    cache: Arc<LocalCache>,
}

impl AppState {
    /// Wire the auth subsystem around explicit provider and store
    /// implementations. Tests inject mocks through this path.
    pub fn assemble(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn RowStore>,
        cache: Arc<LocalCache>,
        sessions: Arc<SessionState>,
        settings: Settings,
    ) -> Self {
        let rate_limiter = AuthRateLimiter::new(&settings.rate_limit, Some(Arc::clone(&cache)));
        let resolver = Arc::new(ProfileResolver::new(
            Arc::clone(&store),
            Arc::clone(&provider),
        ));
        let auth = Arc::new(AuthFacade::new(
            Arc::clone(&provider),
            Arc::clone(&resolver),
            Arc::clone(&sessions),
            Arc::clone(&cache),
            rate_limiter,
            settings.demo.clone(),
        ));

        Self {
            auth,
            sessions,
            settings: Arc::new(settings),
            store,
            provider,
            resolver,
            cache,
        }
    }

    /// Build the application state for the configured backend mode
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let sessions = Arc::new(SessionState::new());
        let cache = Arc::new(LocalCache::new(&settings.data_dir)?);

        let (provider, store): (Arc<dyn IdentityProvider>, Arc<dyn RowStore>) =
            match settings.backend.mode {
                BackendMode::Local => (
                    Arc::new(LocalIdentityProvider::new(
                        &settings.data_dir,
                        settings.session.local_session_ttl_secs,
                    )?),
                    Arc::new(FlatFileStore::new(&settings.data_dir)?),
                ),
                BackendMode::Hosted => {
                    let url = settings
                        .backend
                        .url
                        .clone()
                        .context("backend.url is required in hosted mode")?;
                    let anon_key = settings
                        .backend
                        .anon_key
                        .clone()
                        .context("backend.anon_key is required in hosted mode")?;

                    (
                        Arc::new(HostedIdentityProvider::new(
                            url.clone(),
                            anon_key.clone(),
                            &settings.data_dir,
                        )?),
                        Arc::new(RestRowStore::new(url, anon_key, sessions.bearer_slot())),
                    )
                },
            };

        Ok(Self::assemble(provider, store, cache, sessions, settings))
    }

    /// Session monitor for this state; callers run `initialize()` and
    /// then `spawn()` it.
    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.resolver),
            Arc::clone(&self.sessions),
            Arc::clone(&self.cache),
        )
    }
}
