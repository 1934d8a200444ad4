//! Journal client configuration.
//!
//! Provides a `JournalConfig` shared by every front-end to locate the entry
//! API and tune timeouts, autosave and identity readiness.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::RetryPolicy;
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_path, normalize_text_option};

pub const DEFAULT_ENTRIES_PATH: &str = "/entries";
pub const DEFAULT_NAMESPACE: &str = "journal";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 2000;

pub const ENV_API_URL: &str = "MINDMATCH_API_URL";
pub const ENV_ENTRIES_PATH: &str = "MINDMATCH_ENTRIES_PATH";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MINDMATCH_REQUEST_TIMEOUT_SECS";

/// Client configuration for the journal sync core.
///
/// `api_base_url` is optional: without it the journal runs local-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct JournalConfig {
    pub api_base_url: Option<String>,
    pub entries_path: String,
    pub request_timeout_secs: u64,
    pub autosave_delay_ms: u64,
    pub auth_ready: RetryPolicy,
    pub namespace: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            entries_path: DEFAULT_ENTRIES_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            auth_ready: RetryPolicy::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl JournalConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)?;
        config.normalized()
    }

    /// Apply overrides from a key lookup (normally `std::env::var`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_ENTRIES_PATH)) {
            self.entries_path = path;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            self.request_timeout_secs = raw.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a whole number of seconds"
                ))
            })?;
        }
        self.normalized()
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Validate fields and normalize URLs and paths.
    pub fn normalized(mut self) -> Result<Self> {
        self.api_base_url = match normalize_text_option(self.api_base_url) {
            Some(url) if is_http_url(&url) => Some(url.trim_end_matches('/').to_string()),
            Some(_) => {
                return Err(Error::InvalidInput(
                    "api_base_url must include http:// or https://".to_string(),
                ))
            }
            None => None,
        };

        self.entries_path = normalize_path(&self.entries_path);
        if self.entries_path.is_empty() {
            return Err(Error::InvalidInput(
                "entries_path must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidInput(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        self.namespace = self.namespace.trim().to_string();
        if self.namespace.is_empty() {
            return Err(Error::InvalidInput("namespace must not be empty".to_string()));
        }

        Ok(self)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Full URL of the entries collection, if a remote is configured.
    pub fn entries_url(&self) -> Option<String> {
        self.api_base_url
            .as_ref()
            .map(|base| format!("{base}{}", self.entries_path))
    }

    /// Health endpoint used to probe connectivity.
    pub fn health_url(&self) -> Option<String> {
        self.api_base_url
            .as_ref()
            .map(|base| format!("{base}/health"))
    }
}
