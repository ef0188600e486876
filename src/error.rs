//! Error types for the request builder and the change watcher.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is the
//! single [`ApiError`] enum. Transport failures are kept as strings so the enum stays
//! independent of the concrete transport in use.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors produced by [`ApiClient`](crate::ApiClient) calls and watch tasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The transport failed to complete the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A fetched record is missing a key that the watch baseline holds.
    #[error("wrong keys compatibility: baseline key [{key}] not present in remote object")]
    KeyCompatibility {
        /// The baseline key absent from the remote record.
        key: String,
    },

    /// Request data could not be serialized, or a response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The target URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A wire string did not match any value of an option enum.
    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant {
        /// Name of the option being parsed (e.g. `"mode"`).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// No watch task is registered under this id.
    #[error("watch {0} not found")]
    WatchNotFound(u64),

    /// The watch task ended abnormally (panicked callback or runtime shutdown).
    #[error("watch task aborted: {0}")]
    WatchAborted(String),
}

impl ApiError {
    /// Whether this error stops the watch task that hit it.
    ///
    /// Only key-compatibility failures are fatal; everything else is reported and the
    /// task polls again on its next tick.
    pub fn is_fatal_for_watch(&self) -> bool {
        matches!(self, ApiError::KeyCompatibility { .. })
    }

    /// Whether this error came from the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_key_compatibility_is_fatal() {
        let fatal = ApiError::KeyCompatibility { key: "id".into() };
        assert!(fatal.is_fatal_for_watch());
        assert!(!ApiError::Transport("reset".into()).is_fatal_for_watch());
        assert!(!ApiError::Serialization("eof".into()).is_fatal_for_watch());
    }

    #[test]
    fn test_key_compatibility_message_names_key() {
        let err = ApiError::KeyCompatibility { key: "name".into() };
        assert!(err.to_string().contains("[name]"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: ApiError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ApiError::Serialization(_)));
    }
}
