// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session state handling.
//!
//! `SessionState` is the single injected home for "who is signed in right
//! now": the mirrored token pair, the resolved profile, and the stale /
//! demo flags. Observers subscribe through a `watch` channel instead of
//! reading ambient globals.
use crate::rest::BearerSlot;
use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use parking_lot::RwLock;
use rehabdesk_common::{SessionInfo, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Remaining lifetime below which a session is proactively refreshed
pub const REFRESH_THRESHOLD: Duration = Duration::minutes(5);

/// Mirrored copy of a session issued by the auth service.
/// The service owns it; this copy only drives UI decisions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Identity id of the owner
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// True when the remaining lifetime is below the given threshold
    pub fn expires_within(&self, threshold: Duration) -> bool {
        self.expires_at - Utc::now() < threshold
    }
}

#[derive(Clone, Default)]
struct Snapshot {
    session: Option<Session>,
    profile: Option<UserProfile>,
    /// Profile came from the local cache, not the backend
    stale: bool,
    /// Session was fabricated by the demo bypass
    demo: bool,
}

/// In-process session state, shared across handlers and the monitor
pub struct SessionState {
    inner: RwLock<Snapshot>,
    bearer: BearerSlot,
    profile_tx: watch::Sender<Option<UserProfile>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (profile_tx, _) = watch::channel(None);
        Self {
            inner: RwLock::new(Snapshot::default()),
            bearer: Arc::new(RwLock::new(None)),
            profile_tx,
        }
    }

    /// Shared access-token slot, read by the row client on every request
    pub fn bearer_slot(&self) -> BearerSlot {
        Arc::clone(&self.bearer)
    }

    /// Observe profile changes
    pub fn watch_profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.profile_tx.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.read().session.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.read().profile.clone()
    }

    pub fn is_demo(&self) -> bool {
        self.inner.read().demo
    }

    pub fn is_authenticated(&self) -> bool {
        let snapshot = self.inner.read();
        snapshot.demo
            || snapshot.session.is_some()
            || (snapshot.stale && snapshot.profile.is_some())
    }

    /// A cached profile is in use because the backend was unreachable
    pub fn has_stale_profile(&self) -> bool {
        let snapshot = self.inner.read();
        snapshot.stale && snapshot.profile.is_some()
    }

    /// Summary handed to the client
    pub fn info(&self) -> SessionInfo {
        let snapshot = self.inner.read();
        SessionInfo {
            authenticated: snapshot.demo
                || snapshot.session.is_some()
                || (snapshot.stale && snapshot.profile.is_some()),
            profile: snapshot.profile.clone(),
            stale: snapshot.stale,
            demo: snapshot.demo,
        }
    }

    pub fn set_session(&self, session: Session) {
        *self.bearer.write() = Some(session.access_token.clone());
        let mut snapshot = self.inner.write();
        snapshot.session = Some(session);
        snapshot.demo = false;
        gauge!("session.active").set(1.0);
    }

    pub fn set_profile(&self, profile: UserProfile, stale: bool) {
        {
            let mut snapshot = self.inner.write();
            snapshot.profile = Some(profile.clone());
            snapshot.stale = stale;
        }
        let _ = self.profile_tx.send(Some(profile));
    }

    /// Enter demo mode: no backend session exists, only a fabricated
    /// profile
    pub fn set_demo(&self, profile: UserProfile) {
        {
            let mut snapshot = self.inner.write();
            snapshot.session = None;
            snapshot.profile = Some(profile.clone());
            snapshot.stale = false;
            snapshot.demo = true;
        }
        *self.bearer.write() = None;
        let _ = self.profile_tx.send(Some(profile));
        gauge!("session.active").set(1.0);
    }

    pub fn clear_profile(&self) {
        {
            let mut snapshot = self.inner.write();
            snapshot.profile = None;
            snapshot.stale = false;
        }
        let _ = self.profile_tx.send(None);
    }

    pub fn clear(&self) {
        {
            let mut snapshot = self.inner.write();
            *snapshot = Snapshot::default();
        }
        *self.bearer.write() = None;
        let _ = self.profile_tx.send(None);
        gauge!("session.active").set(0.0);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
