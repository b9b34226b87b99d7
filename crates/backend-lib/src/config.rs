// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path (flat-file store, local cache, key material)
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Which backend the dashboard talks to
    pub backend: BackendSettings,
    /// Session lifetime handling
    pub session: SessionSettings,
    /// Authentication attempt limits
    pub rate_limit: RateLimitSettings,
    /// Demo-mode bypass credentials
    pub demo: DemoSettings,
}

/// Backend selection: the hosted service or the local flat-file prototype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Local,
    Hosted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub mode: BackendMode,
    /// Base URL of the hosted service (required in hosted mode)
    pub url: Option<String>,
    /// Publishable API key of the hosted service
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Remaining lifetime below which a session is proactively refreshed
    pub refresh_threshold_secs: u64,
    /// TTL of sessions issued by the local provider
    pub local_session_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Attempt window duration
    pub window_secs: u64,
    pub max_login_attempts: u32,
    pub max_register_attempts: u32,
    pub max_oauth_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    pub enabled: bool,
    pub email: String,
    pub password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            backend: BackendSettings::default(),
            session: SessionSettings::default(),
            rate_limit: RateLimitSettings::default(),
            demo: DemoSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            mode: BackendMode::Local,
            url: None,
            anon_key: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_threshold_secs: 5 * 60,
            local_session_ttl_secs: 60 * 60 * 24, // 1 day
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_login_attempts: 5,
            max_register_attempts: 3,
            max_oauth_attempts: 3,
        }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            email: "tajademeh@outlook.com".to_string(),
            password: "admin@123".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `rehabdesk.toml` and `REHABDESK_`-prefixed
    /// environment variables, on top of the built-in defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("rehabdesk.toml")
    }

    /// Load settings from an explicit config file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("REHABDESK_").split("__"))
            .extract()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_documented_limits() {
        let settings = Settings::default();
        assert_eq!(settings.rate_limit.window_secs, 15 * 60);
        assert_eq!(settings.rate_limit.max_login_attempts, 5);
        assert_eq!(settings.rate_limit.max_register_attempts, 3);
        assert_eq!(settings.rate_limit.max_oauth_attempts, 3);
        assert_eq!(settings.session.refresh_threshold_secs, 5 * 60);
        assert!(settings.demo.enabled);
        assert_eq!(settings.demo.email, "tajademeh@outlook.com");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("does-not-exist.toml").unwrap();
        assert_eq!(settings.backend.mode, BackendMode::Local);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rehabdesk.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"

[backend]
mode = "hosted"
url = "https://example.supabase.co"
anon_key = "test-key"

[rate_limit]
max_login_attempts = 2
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.backend.mode, BackendMode::Hosted);
        assert_eq!(settings.backend.url.as_deref(), Some("https://example.supabase.co"));
        assert_eq!(settings.rate_limit.max_login_attempts, 2);
        // untouched sections keep their defaults
        assert_eq!(settings.rate_limit.window_secs, 15 * 60);
    }
}
