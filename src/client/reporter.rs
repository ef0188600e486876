//! Error reporting hook.
//!
//! Failures that the crate swallows or re-raises (transport errors on one-shot calls,
//! failed watch polls) are first handed to an [`ErrorReporter`]. The default writes
//! them through `tracing`.

use crate::error::ApiError;

/// Sink for errors observed by the client and the watcher.
pub trait ErrorReporter: Send + Sync {
    /// Record one error.
    fn report(&self, error: &ApiError);
}

/// Reports errors as `tracing::error!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &ApiError) {
        tracing::error!(error = %error, "request failed");
    }
}

/// Discards every error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &ApiError) {}
}
