// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const AUTH_LOGIN: &str = "auth.login";
pub const AUTH_LOGIN_FAILED: &str = "auth.login_failed";
pub const AUTH_DEMO_LOGIN: &str = "auth.demo_login";
pub const AUTH_RATE_LIMITED: &str = "auth.rate_limited";
pub const AUTH_REGISTER: &str = "auth.register";
pub const AUTH_LOGOUT: &str = "auth.logout";
pub const SESSION_REFRESHED: &str = "session.refreshed";
pub const SESSION_REFRESH_FAILED: &str = "session.refresh_failed";
pub const PROFILE_CREATED: &str = "profile.created";
pub const PROFILE_SYNTHESIZED: &str = "profile.synthesized";
pub const CACHE_FALLBACK: &str = "cache.fallback";
