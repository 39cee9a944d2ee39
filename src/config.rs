//! Application configuration parsed from environment variables.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Unparsable numbers fall back to their defaults, as does a result spacing
//! that is not a positive finite number. An unparsable search URL
//! is an error because every search would fail against it.

use std::path::PathBuf;

pub const DEFAULT_SEARCH_URL: &str = "https://cmellor--backend-search-similar-images.modal.run";
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SEARCH_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RESULT_SPACING: f64 = 260.0;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    ConfigParse(String),
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Similarity search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub url: String,
    pub timeouts: SearchTimeouts,
    /// Sent as `filter_portraits` with every request.
    pub filter_portraits: bool,
    /// Horizontal distance between the source image and each inserted result.
    pub result_spacing: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SEARCH_URL.to_string(),
            timeouts: SearchTimeouts {
                request_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
                connect_secs: DEFAULT_SEARCH_CONNECT_TIMEOUT_SECS,
            },
            filter_portraits: false,
            result_spacing: DEFAULT_RESULT_SPACING,
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Snapshot file. No persistence task runs when unset.
    pub path: Option<PathBuf>,
    pub flush_interval_ms: u64,
    /// Cap on stored image bytes.
    pub quota_bytes: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: None, flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS, quota_bytes: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Build config from the process environment (after loading `.env`).
    ///
    /// - `MOODBOARD_SEARCH_URL`: search endpoint
    /// - `MOODBOARD_SEARCH_TIMEOUT_SECS`: default 120
    /// - `MOODBOARD_SEARCH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `MOODBOARD_SEARCH_FILTER_PORTRAITS`: default false
    /// - `MOODBOARD_RESULT_SPACING`: default 260
    /// - `MOODBOARD_STORE_PATH`: snapshot file, optional
    /// - `MOODBOARD_FLUSH_INTERVAL_MS`: default 1000
    /// - `MOODBOARD_STORE_QUOTA_BYTES`: optional
    ///
    /// # Errors
    ///
    /// `ConfigParse` when the search URL is not a valid absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, ".env file could not be loaded");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// `ConfigParse` when the search URL is not a valid absolute URL.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("MOODBOARD_SEARCH_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string());
        reqwest::Url::parse(&url)
            .map_err(|e| ConfigError::ConfigParse(format!("invalid MOODBOARD_SEARCH_URL '{url}': {e}")))?;

        let search = SearchConfig {
            url,
            timeouts: SearchTimeouts {
                request_secs: parse_or(&lookup, "MOODBOARD_SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS),
                connect_secs: parse_or(
                    &lookup,
                    "MOODBOARD_SEARCH_CONNECT_TIMEOUT_SECS",
                    DEFAULT_SEARCH_CONNECT_TIMEOUT_SECS,
                ),
            },
            filter_portraits: lookup("MOODBOARD_SEARCH_FILTER_PORTRAITS")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            result_spacing: Some(parse_or(&lookup, "MOODBOARD_RESULT_SPACING", DEFAULT_RESULT_SPACING))
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(DEFAULT_RESULT_SPACING),
        };

        let store = StoreConfig {
            path: lookup("MOODBOARD_STORE_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            flush_interval_ms: parse_or(&lookup, "MOODBOARD_FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS).max(1),
            quota_bytes: lookup("MOODBOARD_STORE_QUOTA_BYTES").and_then(|v| v.trim().parse().ok()),
        };

        Ok(Self { search, store })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
