// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for authentication attempts.
//!
//! Fixed-window counting per `(identifier, action)`. The identifier is a
//! client fingerprint derived from the user agent — spoofable by
//! construction, so this is a nuisance brake, not a security control;
//! real enforcement belongs on the auth service side.

use crate::auth::cache::LocalCache;
use crate::config::RateLimitSettings;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Guarded authentication action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthAction {
    Login,
    Register,
    OAuth,
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::Login => write!(f, "login"),
            AuthAction::Register => write!(f, "register"),
            AuthAction::OAuth => write!(f, "oauth"),
        }
    }
}

/// Counter state for one `(identifier, action)` key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptWindow {
    pub attempts: u32,
    pub window_start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
}

/// Rate limiter for authentication attempts
#[derive(Clone)]
pub struct AuthRateLimiter {
    windows: Arc<DashMap<String, AttemptWindow>>,
    window: Duration,
    max_login: u32,
    max_register: u32,
    max_oauth: u32,
    cache: Option<Arc<LocalCache>>,
}

impl AuthRateLimiter {
    /// Create a new limiter, hydrating counters persisted by a previous
    /// run when a cache is supplied.
    pub fn new(settings: &RateLimitSettings, cache: Option<Arc<LocalCache>>) -> Self {
        let windows = Arc::new(DashMap::new());

        if let Some(cache) = &cache {
            for (key, record) in cache.rate_limits() {
                windows.insert(key, record);
            }
        }

        Self {
            windows,
            window: Duration::seconds(settings.window_secs as i64),
            max_login: settings.max_login_attempts,
            max_register: settings.max_register_attempts,
            max_oauth: settings.max_oauth_attempts,
            cache,
        }
    }

    fn max_attempts(&self, action: AuthAction) -> u32 {
        match action {
            AuthAction::Login => self.max_login,
            AuthAction::Register => self.max_register,
            AuthAction::OAuth => self.max_oauth,
        }
    }

    fn key(identifier: &str, action: AuthAction) -> String {
        format!("{action}:{identifier}")
    }

    /// Check whether an attempt is allowed, counting the call toward the
    /// window. Denied calls count too; the window boundary is fixed at
    /// the first attempt, so counting denials cannot extend a lockout.
    ///
    /// Any internal failure defaults to **allow** (fail open): a broken
    /// counter must not lock operators out of the dashboard.
    pub fn check(&self, identifier: &str, action: AuthAction) -> bool {
        match self.check_inner(identifier, action) {
            Ok(allowed) => {
                if !allowed {
                    counter!(crate::metrics::AUTH_RATE_LIMITED).increment(1);
                    tracing::warn!(%action, "authentication attempt rate limited");
                }
                allowed
            },
            Err(err) => {
                tracing::warn!(%action, %err, "rate limiter error, failing open");
                true
            },
        }
    }

    fn check_inner(&self, identifier: &str, action: AuthAction) -> Result<bool, crate::error::AppError> {
        let now = Utc::now();
        let max = self.max_attempts(action);
        let key = Self::key(identifier, action);

        let attempts = {
            let mut entry = self.windows.entry(key).or_insert_with(|| AttemptWindow {
                attempts: 0,
                window_start: now,
                last_failure: None,
            });

            // Expired window: treat as a brand-new one
            if now - entry.window_start > self.window {
                entry.attempts = 0;
                entry.window_start = now;
                entry.last_failure = None;
            }

            entry.attempts += 1;
            entry.attempts
        };

        self.persist()?;
        Ok(attempts <= max)
    }

    /// Read-only view: whether the key is currently over its cap.
    /// Does not count toward the window; used to pick the user-visible
    /// message after an attempt was rejected.
    pub fn is_limited(&self, identifier: &str, action: AuthAction) -> bool {
        let Some(entry) = self.windows.get(&Self::key(identifier, action)) else {
            return false;
        };
        if Utc::now() - entry.window_start > self.window {
            return false;
        }
        entry.attempts > self.max_attempts(action)
    }

    /// Record a failed attempt for the guarded action
    pub fn record_failure(&self, identifier: &str, action: AuthAction) {
        let key = Self::key(identifier, action);
        if let Some(mut entry) = self.windows.get_mut(&key) {
            entry.last_failure = Some(Utc::now());
        }
        if let Err(err) = self.persist() {
            tracing::warn!(%err, "failed to persist rate limit counters");
        }
    }

    /// Record a successful attempt: the key's counter is dropped
    pub fn record_success(&self, identifier: &str, action: AuthAction) {
        self.windows.remove(&Self::key(identifier, action));
        if let Err(err) = self.persist() {
            tracing::warn!(%err, "failed to persist rate limit counters");
        }
    }

    fn persist(&self) -> Result<(), crate::error::AppError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let snapshot: HashMap<String, AttemptWindow> = self
            .windows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        cache.store_rate_limits(snapshot)
    }

    /// Drop entries whose window has long elapsed
    pub fn cleanup(&self) {
        let now = Utc::now();
        let window = self.window;
        self.windows.retain(|_, entry| now - entry.window_start <= window);
    }
}

/// Coarse client fingerprint: hashed user agent + 15-minute time bucket.
/// Explicitly not an IP address and trivially spoofable.
pub fn client_fingerprint(user_agent: &str) -> String {
    let bucket = Utc::now().timestamp() / (15 * 60);
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_agent.hash(&mut hasher);
    bucket.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
