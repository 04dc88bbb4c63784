//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STALE_SECS: u64 = 5 * 60;
pub const DEFAULT_PROFILE_STALE_SECS: u64 = 10 * 60;
pub const DEFAULT_GC_SECS: u64 = 10 * 60;
pub const DEFAULT_QUERY_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BASKETEASY_API_BASE_URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Cache timing and read retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long a fetched value is served without refetching.
    pub stale_time: Duration,
    /// Staleness window for the current-user profile.
    pub profile_stale_time: Duration,
    /// How long an unused entry is retained before it is dropped.
    pub gc_time: Duration,
    /// Retries after the first failed read attempt.
    pub max_retries: u32,
    /// First back-off delay; doubles per retry.
    pub retry_base_delay: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(DEFAULT_STALE_SECS),
            profile_stale_time: Duration::from_secs(DEFAULT_PROFILE_STALE_SECS),
            gc_time: Duration::from_secs(DEFAULT_GC_SECS),
            max_retries: DEFAULT_QUERY_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without a trailing slash.
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub query: QueryConfig,
}

impl ClientConfig {
    /// Config with defaults for everything except the base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query: QueryConfig::default(),
        }
    }

    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `BASKETEASY_API_BASE_URL`: default `http://localhost:3000`
    /// - `BASKETEASY_REQUEST_TIMEOUT_SECS`: default 10
    /// - `BASKETEASY_CONNECT_TIMEOUT_SECS`: default 5
    /// - `BASKETEASY_STALE_SECS`: default 300
    /// - `BASKETEASY_PROFILE_STALE_SECS`: default 600
    /// - `BASKETEASY_GC_SECS`: default 600
    /// - `BASKETEASY_QUERY_RETRIES`: default 3
    /// - `BASKETEASY_RETRY_BASE_DELAY_MS`: default 1000
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse as an absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] but reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse as an absolute URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_base = lookup("BASKETEASY_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let base_url = parse_base_url(raw_base.trim())?;

        let parse_u64 = |key: &str, default: u64| parse_or(lookup(key).as_deref(), default);
        let query = QueryConfig {
            stale_time: Duration::from_secs(parse_u64("BASKETEASY_STALE_SECS", DEFAULT_STALE_SECS)),
            profile_stale_time: Duration::from_secs(parse_u64(
                "BASKETEASY_PROFILE_STALE_SECS",
                DEFAULT_PROFILE_STALE_SECS,
            )),
            gc_time: Duration::from_secs(parse_u64("BASKETEASY_GC_SECS", DEFAULT_GC_SECS)),
            max_retries: parse_or(lookup("BASKETEASY_QUERY_RETRIES").as_deref(), DEFAULT_QUERY_RETRIES),
            retry_base_delay: Duration::from_millis(parse_u64(
                "BASKETEASY_RETRY_BASE_DELAY_MS",
                DEFAULT_RETRY_BASE_DELAY_MS,
            )),
        };

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(parse_u64(
                "BASKETEASY_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(parse_u64(
                "BASKETEASY_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            query,
        })
    }
}

fn parse_or<T>(raw: Option<&str>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidBaseUrl { value: raw.to_owned(), reason: e.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_owned(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
