// ============================
// crates/backend-lib/src/auth/monitor.rs
// ============================
//! Session-change monitoring.
//!
//! One long-lived task subscribes to the provider's event stream and
//! keeps the in-process state and the local cache in step with it. The
//! task is owned by a handle so teardown is explicit; nothing keeps
//! running after `shutdown()`.
use super::cache::LocalCache;
use super::provider::{AuthEventKind, IdentityProvider};
use super::resolver::ProfileResolver;
use super::session::{Session, SessionState};
use crate::error::AppError;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Observes session-change notifications and drives profile resolution
pub struct SessionMonitor {
    provider: Arc<dyn IdentityProvider>,
    resolver: Arc<ProfileResolver>,
    state: Arc<SessionState>,
    cache: Arc<LocalCache>,
}

/// Handle owning the monitor task
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop the monitor. In-flight resolution is aborted with it.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl SessionMonitor {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        resolver: Arc<ProfileResolver>,
        state: Arc<SessionState>,
        cache: Arc<LocalCache>,
    ) -> Self {
        Self {
            provider,
            resolver,
            state,
            cache,
        }
    }

    /// Initial session load at process start.
    ///
    /// A network-class failure falls back to the last cached profile
    /// (marked stale) instead of forcing a logout; an authorization-class
    /// failure clears everything — the operator is genuinely signed out.
    pub async fn initialize(&self) {
        match self.provider.current_session().await {
            Ok(Some(session)) => {
                self.apply_session(AuthEventKind::Initial, session).await;
            },
            Ok(None) => {
                self.state.clear();
                self.clear_cache();
            },
            Err(AppError::Network(msg)) => {
                tracing::warn!(%msg, "auth service unreachable at startup");
                match self.cache.profile() {
                    Some(cached) => {
                        counter!(crate::metrics::CACHE_FALLBACK).increment(1);
                        tracing::info!(
                            cached_at = %cached.cached_at,
                            "using cached profile until connectivity returns"
                        );
                        self.state.set_profile(cached.profile, true);
                    },
                    None => self.state.clear(),
                }
            },
            Err(AppError::Authorization(msg)) => {
                tracing::info!(%msg, "persisted session no longer valid");
                self.state.clear();
                self.clear_cache();
            },
            Err(err) => {
                tracing::warn!(%err, "unexpected error reading current session");
                self.state.clear();
            },
        }
    }

    /// Spawn the event loop. Events arriving while a previous one is
    /// still being handled queue up in the broadcast channel.
    pub fn spawn(self) -> MonitorHandle {
        let mut events = self.provider.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_event(event.kind, event.session).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session monitor lagged behind event stream");
                    },
                    Err(RecvError::Closed) => break,
                }
            }
        });

        MonitorHandle { task }
    }

    async fn handle_event(&self, kind: AuthEventKind, session: Option<Session>) {
        tracing::debug!(?kind, has_session = session.is_some(), "session event");

        match (kind, session) {
            (AuthEventKind::SignedOut, None) => {
                self.state.clear();
                self.clear_cache();
            },
            (kind, Some(session)) => self.apply_session(kind, session).await,
            // A sign-out that still carries a session payload, or any
            // other sessionless event: nothing to resolve
            (_, None) => {},
        }
    }

    async fn apply_session(&self, kind: AuthEventKind, session: Session) {
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
            },
            Err(err) => {
                tracing::warn!(?kind, %err, "profile resolution failed");
                self.state.clear();
                self.clear_cache();
            },
        }
    }

    fn clear_cache(&self) {
        if let Err(err) = self.cache.clear_profile() {
            tracing::warn!(%err, "failed to clear cached profile");
        }
    }
}
