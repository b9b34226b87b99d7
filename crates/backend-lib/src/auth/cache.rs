// ============================
// crates/backend-lib/src/auth/cache.rs
// ============================
/** Encrypted local cache for offline resilience.
Holds the last-known-good profile, the rate-limit counters, and the
demo-mode flag. Cached data is never authoritative: the session monitor
overwrites it with server truth on every live resolution. */
use crate::auth::rate_limit::AttemptWindow;
use crate::error::AppError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{rngs::OsRng, RngCore};
use rehabdesk_common::UserProfile;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// Last-known-good copy of the operator's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedProfile {
    pub profile: UserProfile,
    pub cached_at: DateTime<Utc>,
}

/// On-disk cache contents
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    profile: Option<CachedProfile>,
    #[serde(default)]
    rate_limits: HashMap<String, AttemptWindow>,
    #[serde(default)]
    demo_mode: bool,
}

/// Encrypted flat-file cache, written through on every mutation
pub struct LocalCache {
    path: PathBuf,
    encryption_key: [u8; 32],
    state: Mutex<CacheFile>,
}

impl LocalCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        // Load or generate encryption key
        let key_path = dir.join("cache_key");
        let encryption_key = if key_path.exists() {
            let key_data = fs::read(&key_path)?;
            let mut key = [0u8; 32];
            if key_data.len() != 32 {
                return Err(anyhow::anyhow!("Invalid encryption key length"));
            }
            key.copy_from_slice(&key_data);
            key
        } else {
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            fs::write(&key_path, key)?;
            key
        };

        let path = dir.join("cache.dat");
        let state = match Self::load(&path, &encryption_key) {
            Ok(contents) => contents,
            Err(err) => {
                // A corrupted cache must not block startup
                tracing::warn!(%err, "discarding unreadable local cache");
                CacheFile::default()
            },
        };

        Ok(Self {
            path,
            encryption_key,
            state: Mutex::new(state),
        })
    }

    fn load(path: &Path, key: &[u8; 32]) -> anyhow::Result<CacheFile> {
        if !path.exists() {
            return Ok(CacheFile::default());
        }

        let combined = fs::read(path)?;
        if combined.len() < 12 {
            // Nonce is 12 bytes
            return Err(anyhow::anyhow!("Invalid cache file"));
        }

        let (nonce_bytes, encrypted_data) = combined.split_at(12);
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| anyhow::anyhow!("Invalid encryption key"))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let decrypted = cipher
            .decrypt(nonce, encrypted_data)
            .map_err(|_| anyhow::anyhow!("Cache decryption failed"))?;

        let contents: CacheFile = serde_json::from_slice(&decrypted)?;
        Ok(contents)
    }

    fn save(&self, state: &CacheFile) -> Result<(), AppError> {
        let json = serde_json::to_vec(state)?;

        let cipher = Aes256Gcm::new_from_slice(&self.encryption_key)
            .map_err(|_| AppError::Internal("Invalid encryption key".to_string()))?;
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let encrypted = cipher
            .encrypt(nonce, json.as_slice())
            .map_err(|_| AppError::Internal("Cache encryption failed".to_string()))?;

        let mut combined = Vec::with_capacity(nonce_bytes.len() + encrypted.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&encrypted);

        fs::write(&self.path, combined)?;
        Ok(())
    }

    /// Last cached profile, if any
    pub fn profile(&self) -> Option<CachedProfile> {
        self.state.lock().profile.clone()
    }

    pub fn store_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.profile = Some(CachedProfile {
            profile: profile.clone(),
            cached_at: Utc::now(),
        });
        self.save(&state)
    }

    pub fn clear_profile(&self) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.profile = None;
        self.save(&state)
    }

    /// Persisted rate-limit counters from a previous run
    pub fn rate_limits(&self) -> HashMap<String, AttemptWindow> {
        self.state.lock().rate_limits.clone()
    }

    pub fn store_rate_limits(
        &self,
        counters: HashMap<String, AttemptWindow>,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.rate_limits = counters;
        self.save(&state)
    }

    pub fn demo_mode(&self) -> bool {
        self.state.lock().demo_mode
    }

    pub fn set_demo_mode(&self, enabled: bool) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.demo_mode = enabled;
        self.save(&state)
    }
}
