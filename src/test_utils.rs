//! In-memory collaborators shared by the unit tests.

use crate::client::{ErrorReporter, Transport};
use crate::error::{ApiError, Result};
use crate::types::{RequestOptions, Response};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Transport that records every call and answers from a script.
///
/// Queued outcomes are consumed in order; the last one is repeated once it is the only
/// one left. With nothing queued every call gets `200 {}`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    calls: Arc<Mutex<Vec<(String, RequestOptions)>>>,
    script: Arc<Mutex<VecDeque<Result<Response>>>>,
}

impl ScriptedTransport {
    pub(crate) fn with_json_bodies<'a>(bodies: impl IntoIterator<Item = &'a str>) -> Self {
        let transport = Self::default();
        for body in bodies {
            transport.push_body(body);
        }
        transport
    }

    pub(crate) fn push_body(&self, body: &str) {
        self.script.lock().push_back(Ok(Response::new(200, body.to_string())));
    }

    pub(crate) fn push_err(&self, err: ApiError) {
        self.script.lock().push_back(Err(err));
    }

    pub(crate) fn calls(&self) -> Vec<(String, RequestOptions)> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response> {
        self.calls.lock().push((url.to_string(), options));
        let mut script = self.script.lock();
        match script.len() {
            0 => Ok(Response::new(200, "{}")),
            1 => script[0].clone(),
            _ => script.pop_front().unwrap_or_else(|| Ok(Response::new(200, "{}"))),
        }
    }
}

/// Reporter that keeps the rendered message of every error.
#[derive(Clone, Default)]
pub(crate) struct CollectingReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingReporter {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &ApiError) {
        self.messages.lock().push(error.to_string());
    }
}

/// Route `tracing` output to the test harness.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
