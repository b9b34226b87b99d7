// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! This test suite validates the windowed `AuthRateLimiter`, including
//! counter persistence through the local cache.
use backend_lib::auth::{AuthAction, AuthRateLimiter, LocalCache};
use backend_lib::config::RateLimitSettings;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn oauth_shares_the_register_cap() {
    let limiter = AuthRateLimiter::new(&RateLimitSettings::default(), None);

    for _ in 0..3 {
        assert!(limiter.check("client", AuthAction::OAuth));
    }
    assert!(!limiter.check("client", AuthAction::OAuth));
}

#[test]
fn is_limited_does_not_count_attempts() {
    let limiter = AuthRateLimiter::new(&RateLimitSettings::default(), None);

    // Peeking repeatedly must not burn attempts
    for _ in 0..20 {
        assert!(!limiter.is_limited("client", AuthAction::Login));
    }

    for _ in 0..5 {
        assert!(limiter.check("client", AuthAction::Login));
    }
    assert!(!limiter.is_limited("client", AuthAction::Login));

    // The denied sixth call flips the peek
    assert!(!limiter.check("client", AuthAction::Login));
    assert!(limiter.is_limited("client", AuthAction::Login));
}

#[test]
fn counters_survive_a_restart_via_the_cache() {
    let dir = TempDir::new().unwrap();
    let settings = RateLimitSettings::default();

    {
        let cache = Arc::new(LocalCache::new(dir.path()).unwrap());
        let limiter = AuthRateLimiter::new(&settings, Some(cache));
        for _ in 0..5 {
            limiter.check("persistent-client", AuthAction::Login);
        }
    }

    // A new limiter over the same cache continues the same window
    let cache = Arc::new(LocalCache::new(dir.path()).unwrap());
    let limiter = AuthRateLimiter::new(&settings, Some(cache));
    assert!(!limiter.check("persistent-client", AuthAction::Login));
}

#[test]
fn record_failure_without_prior_check_is_harmless() {
    let limiter = AuthRateLimiter::new(&RateLimitSettings::default(), None);

    limiter.record_failure("unseen-client", AuthAction::Login);
    assert!(limiter.check("unseen-client", AuthAction::Login));
}
