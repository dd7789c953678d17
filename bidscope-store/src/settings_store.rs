//! User settings store.
//!
//! Settings live in one JSON file. Every field has a default so that older
//! or hand-edited files keep loading, and the API token can be supplied by
//! the environment instead of the file.

use bidscope_fetch::{DispatchStrategy, FetchSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "BIDSCOPE_TOKEN";

/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://www.freelancer.com/api";

const REDACTED: &str = "********";

// ============================================================================
// Settings
// ============================================================================

/// User preferences.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API base URL.
    pub api_base_url: String,

    /// Header the token is sent in.
    pub credential_header: String,

    /// API token. The environment variable takes precedence.
    pub token: Option<String>,

    /// Identity used when the current user cannot be resolved.
    pub fallback_user_id: Option<u64>,

    /// Concurrent HTTP requests.
    pub max_concurrent: usize,

    /// Attempts per GET request.
    pub max_retries: u32,

    /// Per-request timeout.
    pub request_timeout_secs: u64,

    /// Page size for the thread listing.
    pub thread_page_size: u32,

    /// Enrich one thread at a time.
    pub sequential: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credential_header: bidscope_fetch::DEFAULT_CREDENTIAL_HEADER.to_string(),
            token: None,
            fallback_user_id: None,
            max_concurrent: fetch.max_concurrent,
            max_retries: fetch.max_retries,
            request_timeout_secs: 30,
            thread_page_size: fetch.thread_page_size,
            sequential: false,
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_base_url", &self.api_base_url)
            .field("credential_header", &self.credential_header)
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("fallback_user_id", &self.fallback_user_id)
            .field("max_concurrent", &self.max_concurrent)
            .field("max_retries", &self.max_retries)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("thread_page_size", &self.thread_page_size)
            .field("sequential", &self.sequential)
            .finish()
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set_value`].
    pub const KEYS: &'static [&'static str] = &[
        "api_base_url",
        "credential_header",
        "token",
        "fallback_user_id",
        "max_concurrent",
        "max_retries",
        "request_timeout_secs",
        "thread_page_size",
        "sequential",
    ];

    /// Copy with the token masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            token: self.token.as_ref().map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }

    /// Picks the token: a non-empty `env_value` wins over the stored one.
    pub fn resolve_token(&self, env_value: Option<&str>) -> Option<String> {
        env_value
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| self.token.clone().filter(|t| !t.trim().is_empty()))
    }

    /// Token from [`TOKEN_ENV`] or the settings file.
    pub fn effective_token(&self) -> Option<String> {
        self.resolve_token(std::env::var(TOKEN_ENV).ok().as_deref())
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Settings for the fetch layer.
    pub fn fetch_settings(&self) -> FetchSettings {
        let dispatch = if self.sequential {
            DispatchStrategy::Sequential
        } else {
            DispatchStrategy::Concurrent {
                max_in_flight: self.max_concurrent.max(1),
            }
        };
        FetchSettings {
            max_concurrent: self.max_concurrent.max(1),
            max_retries: self.max_retries.max(1),
            thread_page_size: self.thread_page_size.max(1),
            fallback_user_id: self.fallback_user_id,
            dispatch,
        }
    }

    /// Sets one field from its string form.
    ///
    /// Optional fields are cleared with an empty value or `none`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        let cleared = value.is_empty() || value.eq_ignore_ascii_case("none");

        match key {
            "api_base_url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(StoreError::Config(format!(
                        "api_base_url must be an http(s) URL, got {value:?}"
                    )));
                }
                self.api_base_url = value.trim_end_matches('/').to_string();
            }
            "credential_header" => {
                if cleared {
                    return Err(StoreError::Config("credential_header cannot be empty".into()));
                }
                self.credential_header = value.to_ascii_lowercase();
            }
            "token" => self.token = (!cleared).then(|| value.to_string()),
            "fallback_user_id" => {
                self.fallback_user_id = if cleared {
                    None
                } else {
                    Some(parse_number(key, value)?)
                };
            }
            "max_concurrent" => self.max_concurrent = parse_positive(key, value)?,
            "max_retries" => self.max_retries = parse_positive(key, value)?,
            "request_timeout_secs" => self.request_timeout_secs = parse_positive(key, value)?,
            "thread_page_size" => self.thread_page_size = parse_positive(key, value)?,
            "sequential" => {
                self.sequential = match value.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => true,
                    "false" | "no" | "0" | "off" => false,
                    _ => {
                        return Err(StoreError::Config(format!(
                            "sequential expects true or false, got {value:?}"
                        )));
                    }
                };
            }
            other => {
                return Err(StoreError::Config(format!(
                    "unknown key {other:?} (expected one of: {})",
                    Self::KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Config(format!("{key} expects a number, got {value:?}")))
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed: T = parse_number(key, value)?;
    if parsed <= T::default() {
        return Err(StoreError::Config(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store with default settings that saves to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. An unreadable one is logged and
    /// also yields defaults, so a bad edit never locks the user out.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if tokio::fs::try_exists(&path).await? {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
        })
    }

    /// Where the settings are saved.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Applies `f` to the settings in memory.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
    }

    /// Sets one field from its string form, in memory.
    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.settings.write().await.set_value(key, value)
    }

    /// Restores the defaults, in memory.
    pub async fn reset(&self) {
        *self.settings.write().await = Settings::default();
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
