//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ApiError;
use crate::util::inactivity::IdleTimeouts;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.editorialhub.site/api/";
pub const DEFAULT_TOKEN_FILE_NAME: &str = ".editorial/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STARTUP_RETRIES: u32 = 3;
pub const DEFAULT_STARTUP_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_IDLE_WARN_SECS: u64 = 25 * 60;
pub const DEFAULT_IDLE_LOGOUT_SECS: u64 = 30 * 60;

/// What a request does when its 401 arrives while another refresh is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Fail the request with a session-expired error.
    #[default]
    Reject,
    /// Wait for the running refresh and retry once with its tokens.
    Await,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub token_file: PathBuf,
    pub timeouts: HttpTimeouts,
    pub startup_retry: RetryPolicy,
    pub refresh_policy: RefreshPolicy,
    pub idle: IdleTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token_file: default_token_file(std::env::var("HOME").ok().as_deref()),
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            startup_retry: RetryPolicy::fixed(
                DEFAULT_STARTUP_RETRIES,
                Duration::from_millis(DEFAULT_STARTUP_RETRY_DELAY_MS),
            ),
            refresh_policy: RefreshPolicy::Reject,
            idle: IdleTimeouts::new(
                Duration::from_secs(DEFAULT_IDLE_WARN_SECS),
                Duration::from_secs(DEFAULT_IDLE_LOGOUT_SECS),
            ),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// All optional:
    /// - `EDITORIAL_API_URL`: API base URL (default `https://api.editorialhub.site/api/`)
    /// - `EDITORIAL_TOKEN_FILE`: token pair location (default `$HOME/.editorial/session.json`)
    /// - `EDITORIAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `EDITORIAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `EDITORIAL_STARTUP_RETRIES`: default 3
    /// - `EDITORIAL_STARTUP_RETRY_DELAY_MS`: default 1000
    /// - `EDITORIAL_REFRESH_POLICY`: `reject` (default) or `await`
    /// - `EDITORIAL_IDLE_WARN_SECS` / `EDITORIAL_IDLE_LOGOUT_SECS`: default 1500 / 1800
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for an unknown refresh policy or an idle
    /// warning that does not come before the idle logout.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_url = std::env::var("EDITORIAL_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map_or_else(|| DEFAULT_API_URL.to_owned(), |url| normalize_api_url(&url));
        let token_file = std::env::var("EDITORIAL_TOKEN_FILE").map_or_else(
            |_| default_token_file(std::env::var("HOME").ok().as_deref()),
            PathBuf::from,
        );
        let timeouts = HttpTimeouts {
            request_secs: env_parse("EDITORIAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("EDITORIAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let startup_retry = RetryPolicy::fixed(
            env_parse("EDITORIAL_STARTUP_RETRIES", DEFAULT_STARTUP_RETRIES),
            Duration::from_millis(env_parse("EDITORIAL_STARTUP_RETRY_DELAY_MS", DEFAULT_STARTUP_RETRY_DELAY_MS)),
        );
        let refresh_policy = parse_refresh_policy(std::env::var("EDITORIAL_REFRESH_POLICY").ok().as_deref())?;

        let warn_secs = env_parse("EDITORIAL_IDLE_WARN_SECS", DEFAULT_IDLE_WARN_SECS);
        let logout_secs = env_parse("EDITORIAL_IDLE_LOGOUT_SECS", DEFAULT_IDLE_LOGOUT_SECS);
        if warn_secs >= logout_secs {
            return Err(ApiError::Config(format!(
                "EDITORIAL_IDLE_WARN_SECS ({warn_secs}) must be below EDITORIAL_IDLE_LOGOUT_SECS ({logout_secs})"
            )));
        }
        let idle = IdleTimeouts::new(Duration::from_secs(warn_secs), Duration::from_secs(logout_secs));

        Ok(Self { api_url, token_file, timeouts, startup_retry, refresh_policy, idle })
    }
}

/// Ensure a single trailing slash so relative paths join cleanly.
#[must_use]
pub fn normalize_api_url(raw: &str) -> String {
    format!("{}/", raw.trim().trim_end_matches('/'))
}

fn default_token_file(home: Option<&str>) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(DEFAULT_TOKEN_FILE_NAME),
        _ => PathBuf::from(DEFAULT_TOKEN_FILE_NAME),
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_refresh_policy(raw: Option<&str>) -> Result<RefreshPolicy, ApiError> {
    match raw.map_or("reject", str::trim) {
        "reject" | "" => Ok(RefreshPolicy::Reject),
        "await" => Ok(RefreshPolicy::Await),
        other => Err(ApiError::Config(format!(
            "unknown EDITORIAL_REFRESH_POLICY '{other}' (expected 'reject' or 'await')"
        ))),
    }
}
