use std::time::Duration;

use crate::assistant::AssistantConfig;
use crate::preload::PreloadConfig;

/// Application-level constants
pub const APP_NAME: &str = "Potato Guardian";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prediction service used when `POTATO_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default timeout for a single prediction request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,potato_guardian_lib=debug"
}

/// Runtime configuration consumed from outside the core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the prediction service (`/predict` is appended).
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub preload: PreloadConfig,
    pub assistant: AssistantConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            preload: PreloadConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Missing keys keep their defaults. Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("POTATO_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secs) = parse_var(&lookup, "POTATO_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }
        if let Some(enabled) = parse_flag(&lookup, "POTATO_PRELOAD_ENABLED") {
            config.preload.enabled = enabled;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "POTATO_PRELOAD_DELAY_MS") {
            config.preload.start_delay = Duration::from_millis(ms);
        }
        if let Some(base) = lookup("POTATO_IMAGE_BASE_PATH") {
            config.preload.image_base_path = base;
        }
        if let Some(lazy) = parse_flag(&lookup, "POTATO_IMAGE_LAZY_LOADING") {
            config.preload.lazy_loading = lazy;
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.trim().is_empty()) {
            config.assistant.api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|v| !v.trim().is_empty()) {
            config.assistant.model = model;
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration flag");
            None
        }
    }
}
