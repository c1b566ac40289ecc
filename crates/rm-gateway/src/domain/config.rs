//! Gateway configuration with validation.
//!
//! Values come from `Default`, optionally a JSON file, and finally the process
//! environment. The environment is read once at startup; there is no reload.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable names understood by [`GatewayConfig::apply_env`].
pub mod env_keys {
    pub const BASE_URL: &str = "RM_API_BASE_URL";
    pub const TOKEN: &str = "RM_API_TOKEN";
    pub const USER_AGENT: &str = "RM_USER_AGENT";
    pub const REQUEST_TIMEOUT_MS: &str = "RM_REQUEST_TIMEOUT";
    pub const WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
    pub const MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
    pub const ADMISSION_MAX_WAIT_MS: &str = "RM_ADMISSION_MAX_WAIT_MS";
    pub const PAGE_SIZE: &str = "RM_PAGE_SIZE";
    pub const MAX_PAGE_SIZE: &str = "RM_MAX_PAGE_SIZE";
    pub const MAX_PAGES: &str = "RM_MAX_PAGES";
    pub const MAX_BULK_ITEMS: &str = "RM_MAX_BULK_ITEMS";
}

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upstream API endpoint and credentials
    pub api: ApiConfig,
    /// Admission queue (sliding window) configuration
    pub rate_limit: RateLimitConfig,
    /// Pagination limits
    pub pagination: PaginationConfig,
    /// Bulk operation limits
    pub bulk: BulkConfig,
}

impl GatewayConfig {
    /// Build configuration from defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment-like lookup.
    ///
    /// Unset keys leave the current value untouched. A set but unparsable
    /// value is an error rather than a silent fallback.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(env_keys::BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(env_keys::TOKEN) {
            self.api.token = token;
        }
        if let Some(agent) = lookup(env_keys::USER_AGENT) {
            self.api.user_agent = agent;
        }
        if let Some(ms) = parse_env::<u64>(&lookup, env_keys::REQUEST_TIMEOUT_MS)? {
            self.api.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>(&lookup, env_keys::WINDOW_MS)? {
            self.rate_limit.window = Duration::from_millis(ms);
        }
        if let Some(max) = parse_env::<usize>(&lookup, env_keys::MAX_REQUESTS)? {
            self.rate_limit.max_requests = max;
        }
        if let Some(ms) = parse_env::<u64>(&lookup, env_keys::ADMISSION_MAX_WAIT_MS)? {
            self.rate_limit.max_wait = Some(Duration::from_millis(ms));
        }
        if let Some(size) = parse_env::<u32>(&lookup, env_keys::PAGE_SIZE)? {
            self.pagination.default_page_size = size;
        }
        if let Some(size) = parse_env::<u32>(&lookup, env_keys::MAX_PAGE_SIZE)? {
            self.pagination.max_page_size = size;
        }
        if let Some(pages) = parse_env::<u32>(&lookup, env_keys::MAX_PAGES)? {
            self.pagination.max_pages = pages;
        }
        if let Some(items) = parse_env::<usize>(&lookup, env_keys::MAX_BULK_ITEMS)? {
            self.bulk.max_items = items;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingValue(env_keys::BASE_URL));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "base url must be http(s): {}",
                self.api.base_url
            )));
        }
        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_requests cannot be 0".into(),
            ));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidRateLimit("window cannot be 0".into()));
        }
        if self.rate_limit.poll_interval.is_zero() || self.rate_limit.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidRateLimit(
                "poll and sweep intervals cannot be 0".into(),
            ));
        }

        if self.pagination.max_page_size == 0 || self.pagination.default_page_size == 0 {
            return Err(ConfigError::InvalidLimit("page sizes cannot be 0".into()));
        }
        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(ConfigError::InvalidLimit(format!(
                "default page size {} exceeds max page size {}",
                self.pagination.default_page_size, self.pagination.max_page_size
            )));
        }
        if self.pagination.max_pages == 0 {
            return Err(ConfigError::InvalidLimit("max_pages cannot be 0".into()));
        }

        if self.bulk.max_items == 0 {
            return Err(ConfigError::InvalidLimit("bulk max_items cannot be 0".into()));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
    }
}

/// Upstream API configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto
    pub base_url: String,
    /// Pre-issued bearer token
    #[serde(skip_serializing)]
    pub token: String,
    /// User-Agent header value
    pub user_agent: String,
    /// Per-request transport timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// TCP connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v3".to_string(),
            token: String::new(),
            user_agent: crate::user_agent(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// Hand-written so the token never reaches logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("user_agent", &self.user_agent)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Sliding-window admission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of the sliding window
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    /// Maximum admitted requests inside one window
    pub max_requests: usize,
    /// Period of the background sweep that drops stale timestamps
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Sleep between quota checks while a caller is blocked
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Upper bound on time spent waiting for quota. `None` waits forever.
    #[serde(with = "humantime_serde::option")]
    pub max_wait: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_requests: 100,
            sweep_interval: Duration::from_millis(1_000),
            poll_interval: Duration::from_millis(100),
            max_wait: None,
        }
    }
}

/// Pagination limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size used when the caller does not pass `per-page`
    pub default_page_size: u32,
    /// Largest page size the upstream accepts
    pub max_page_size: u32,
    /// Pages fetched before giving up on a backend that never ends
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 200,
            max_pages: 500,
        }
    }
}

/// Bulk operation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Maximum items accepted in one bulk call
    pub max_items: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self { max_items: 100 }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Required value missing
    #[error("missing required value: {0}")]
    MissingValue(&'static str),
    /// Environment variable present but unparsable
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before the bare "s" and "m" suffixes.
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Plain numbers are milliseconds, matching the env variables
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid duration format")
        }
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| super::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
