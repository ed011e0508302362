// src/models/config.rs

use serde::Deserialize;

use crate::error::{AppError, Result};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub scraper: ScraperConfig,
    pub push: PushConfig,
}

/// Upstream courthouse endpoints and HTTP behavior
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Display-board page URL
    pub base_url: String,
    /// JSON XHR endpoint URL
    pub xhr_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            xhr_url: String::new(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 15,
        }
    }
}

/// Scrape-cycle settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScraperConfig {
    /// Tick interval in milliseconds
    pub interval_ms: u64,
    pub enabled: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            enabled: true,
        }
    }
}

/// Push gateway credentials: either a service-account file, or the
/// project id / private key / client email triple.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PushConfig {
    pub service_account_path: Option<String>,
    pub project_id: Option<String>,
    pub private_key: Option<String>,
    pub client_email: Option<String>,
}

impl PushConfig {
    /// Whether a complete credential set is present.
    pub fn has_credentials(&self) -> bool {
        self.service_account_path.is_some()
            || (self.project_id.is_some()
                && self.private_key.is_some()
                && self.client_email.is_some())
    }
}

impl Config {
    /// Apply recognized environment overrides on top of the file config.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("SCRAPER_INTERVAL") {
            if let Ok(ms) = value.trim().parse::<u64>() {
                self.scraper.interval_ms = ms;
            }
        }
        if let Ok(value) = std::env::var("COURT_BASE_URL") {
            self.upstream.base_url = value;
        }
        if let Ok(value) = std::env::var("COURT_XHR_URL") {
            self.upstream.xhr_url = value;
        }
        // Scheduling is disabled only by the exact string "false".
        if let Ok(value) = std::env::var("ENABLE_SCRAPER") {
            if value == "false" {
                self.scraper.enabled = false;
            }
        }
        if let Ok(value) = std::env::var("FCM_SERVICE_ACCOUNT") {
            self.push.service_account_path = Some(value);
        }
        if let Ok(value) = std::env::var("FCM_PROJECT_ID") {
            self.push.project_id = Some(value);
        }
        if let Ok(value) = std::env::var("FCM_PRIVATE_KEY") {
            self.push.private_key = Some(value);
        }
        if let Ok(value) = std::env::var("FCM_CLIENT_EMAIL") {
            self.push.client_email = Some(value);
        }
    }

    /// Validate that the configuration is runnable.
    pub fn validate(&self) -> Result<()> {
        if self.upstream.base_url.is_empty() {
            return Err(AppError::config("upstream.base_url is not set"));
        }
        if self.upstream.xhr_url.is_empty() {
            return Err(AppError::config("upstream.xhr_url is not set"));
        }
        url::Url::parse(&self.upstream.base_url)?;
        url::Url::parse(&self.upstream.xhr_url)?;
        if self.scraper.interval_ms == 0 {
            return Err(AppError::config("scraper.interval_ms must be positive"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(AppError::config("upstream.timeout_secs must be positive"));
        }
        Ok(())
    }
}
