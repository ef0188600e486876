//! Client configuration.
//!
//! [`ClientConfig`] tunes the reqwest-backed transport and supplies the defaults used
//! by the watcher. It deserializes from JSON with every field optional:
//!
//! ```
//! use pollwatch_http::client::ClientConfig;
//!
//! let config = ClientConfig::from_json(r#"{ "poll_interval_ms": 250 }"#).unwrap();
//! assert_eq!(config.poll_interval_ms, 250);
//! assert!(config.enable_logging);
//! ```

use crate::error::Result;
use crate::protocol::constants::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`ApiClient`](crate::ApiClient) and its default transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout in milliseconds. `0` disables the timeout.
    pub request_timeout_ms: u64,

    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,

    /// Proxy for every request. Empty means no proxy.
    pub proxy_url: String,

    /// `User-Agent` sent by the default transport.
    pub user_agent: String,

    /// Add `content-type: application/json` to requests with a body when the caller
    /// did not set one.
    pub json_content_type: bool,

    /// Default delay between two polls of a watch task, in milliseconds.
    pub poll_interval_ms: u64,

    /// Emit `tracing` events for requests and watch lifecycle.
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: 0,
            pool_max_idle_per_host: 16,
            proxy_url: String::new(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            json_content_type: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            enable_logging: true,
        }
    }
}

impl ClientConfig {
    /// Parse a configuration document. Missing fields keep their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// The default poll interval, never shorter than one millisecond.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }

    /// The request timeout, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.request_timeout(), None);
        assert!(config.user_agent.starts_with("pollwatch_http/"));
        assert!(config.json_content_type);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = ClientConfig::from_json(r#"{"request_timeout_ms": 1500, "enable_logging": false}"#).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert!(!config.enable_logging);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_malformed_document() {
        let err = ClientConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
