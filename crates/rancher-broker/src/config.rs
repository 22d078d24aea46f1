//! Broker service configuration.
//!
//! Built from environment variables at startup and turned into the shared
//! [`Transport`](crate::transport::Transport) and
//! [`Pipeline`](crate::pipeline::Pipeline) held in Axum state.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use rancher_models::SessionMode;
use tracing::warn;

use crate::retry::{ExponentialBackoff, RetryConfig};

/// Upper bound on the delay between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Global configuration shared across all handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to listen on (default `3002`).
    pub listen_port: u16,
    /// Retries after the first attempt of each outbound call (default `3`).
    pub retry_count: u32,
    /// Initial backoff between retries (default 100 ms, doubling).
    pub retry_backoff: Duration,
    /// Timeout for each outbound request (default 30 s).
    pub request_timeout: Duration,
    /// How login sessions are returned (default cookie).
    pub session_mode: SessionMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_port: 3002,
            retry_count: 3,
            retry_backoff: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
            session_mode: SessionMode::Cookie,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                      | Default  | Description                          |
    /// |-------------------------------|----------|--------------------------------------|
    /// | `BROKER_PORT`                 | `3002`   | HTTP listen port                     |
    /// | `BROKER_RETRY_COUNT`          | `3`      | Transport retries per outbound call  |
    /// | `BROKER_RETRY_BACKOFF_MS`     | `100`    | Initial retry backoff                |
    /// | `BROKER_REQUEST_TIMEOUT_SECS` | `30`     | Per-request timeout                  |
    /// | `BROKER_SESSION_MODE`         | `cookie` | `cookie` or `json` login responses   |
    ///
    /// Values that fail to parse fall back to their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            listen_port: parse_or(&lookup, "BROKER_PORT", defaults.listen_port),
            retry_count: parse_or(&lookup, "BROKER_RETRY_COUNT", defaults.retry_count),
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "BROKER_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            request_timeout: Duration::from_secs(parse_nonzero_or(
                &lookup,
                "BROKER_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            session_mode: parse_or(&lookup, "BROKER_SESSION_MODE", defaults.session_mode),
        }
    }

    /// Retry policy for outbound calls.
    ///
    /// The total budget covers every attempt timing out plus the backoff
    /// between them, saturating instead of overflowing.
    pub fn retry_config(&self) -> RetryConfig {
        let attempts = self.retry_count.saturating_add(1);
        let budget = self
            .request_timeout
            .saturating_mul(attempts)
            .saturating_add(Duration::from_secs(10));
        RetryConfig::builder()
            .max_retries(self.retry_count)
            .backoff(ExponentialBackoff::new(self.retry_backoff, MAX_BACKOFF))
            .total_timeout(budget)
            .build()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, fallback = %default, "invalid configuration value");
            default
        }),
    }
}

/// Like [`parse_or`], but zero also falls back to the default.
fn parse_nonzero_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match parse_or(lookup, key, default) {
        0 => {
            warn!(key, fallback = default, "zero is not allowed, using default");
            default
        }
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.listen_port, 3002);
        assert_eq!(cfg.retry_count, 3);
        assert_eq!(cfg.session_mode, SessionMode::Cookie);
    }

    #[test]
    fn values_are_read_from_lookup() {
        let cfg = config(&[
            ("BROKER_PORT", "8080"),
            ("BROKER_RETRY_COUNT", "5"),
            ("BROKER_RETRY_BACKOFF_MS", "250"),
            ("BROKER_REQUEST_TIMEOUT_SECS", "7"),
            ("BROKER_SESSION_MODE", "json"),
        ]);
        assert_eq!(cfg.listen_port, 8080);
        assert_eq!(cfg.retry_count, 5);
        assert_eq!(cfg.retry_backoff, Duration::from_millis(250));
        assert_eq!(cfg.request_timeout, Duration::from_secs(7));
        assert_eq!(cfg.session_mode, SessionMode::Json);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = config(&[("BROKER_PORT", "http"), ("BROKER_SESSION_MODE", "saml")]);
        assert_eq!(cfg.listen_port, 3002);
        assert_eq!(cfg.session_mode, SessionMode::Cookie);
    }

    #[test]
    fn retry_config_follows_settings() {
        let retry = config(&[("BROKER_RETRY_COUNT", "2"), ("BROKER_REQUEST_TIMEOUT_SECS", "5")])
            .retry_config();
        assert_eq!(retry.max_retries, 2);
        assert_eq!(retry.total_timeout, Some(Duration::from_secs(25)));
    }

    #[test]
    fn zero_request_timeout_falls_back_to_default() {
        let cfg = config(&[("BROKER_REQUEST_TIMEOUT_SECS", "0")]);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn huge_retry_count_saturates_the_budget() {
        let retry = config(&[
            ("BROKER_RETRY_COUNT", "4294967295"),
            ("BROKER_REQUEST_TIMEOUT_SECS", "18446744073709551615"),
        ])
        .retry_config();
        assert_eq!(retry.max_retries, u32::MAX);
        assert_eq!(retry.total_timeout, Some(Duration::MAX));
    }
}
