#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Overview
//!
//! Two cooperating components:
//!
//! 1. **[`ApiClient`]** - a request builder bound to one URL. Mode, cache policy,
//!    credentials, headers, redirect and referrer policy are set with chaining setters,
//!    persist across calls, and are handed to a pluggable [`Transport`] together with
//!    the method and JSON body of each call.
//! 2. **[`Watcher`]** - polls the client's URL on an interval, diffs each fetched JSON
//!    object against a baseline, updates the baseline in place and calls back with it
//!    whenever a watched field changed.
//!
//! The watcher depends on the client's `GET`; the client knows nothing about watching.
//!
//! ## Request Builder
//!
//! ```ignore
//! use pollwatch_http::{ApiClient, Mode, ReferrerPolicy};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> pollwatch_http::Result<()> {
//!     let mut api = ApiClient::new("http://localhost:8080/items");
//!     api.set_mode(Mode::SameOrigin)
//!         .set_referrer_policy(ReferrerPolicy::Client)
//!         .set_header("Authorization", "Bearer token");
//!
//!     let created = api.post(&json!({ "name": "widget" })).await?;
//!     println!("Status: {}", created.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Watching a Resource
//!
//! ```ignore
//! use pollwatch_http::{to_snapshot, ApiClient, Watcher, WatchOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> pollwatch_http::Result<()> {
//!     let watcher = Watcher::new(ApiClient::new("http://localhost:8080/items/1"));
//!     let baseline = to_snapshot(&json!({ "id": 1, "name": "A" }))?;
//!
//!     let id = watcher.watch_with(
//!         baseline,
//!         |item| println!("changed: {item:?}"),
//!         WatchOptions::new().interval_ms(500).limit(10),
//!     );
//!     watcher.wait(id).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Option enums, the options record, responses, snapshots
//! - **[error]** - Error type and result alias
//! - **[client]** - Request builder, transports, reporters, configuration
//! - **[watch]** - Polling watcher, diff policy, task registry
//! - **[protocol]** - Header multi-map and constants

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;
pub mod watch;

pub use client::{
    from_fn, ApiClient, ClientConfig, ErrorReporter, NoopReporter, ReqwestTransport, Transport,
    TracingReporter,
};
pub use error::{ApiError, Result};
pub use protocol::Headers;
pub use types::{
    to_snapshot, CacheMode, Credentials, Method, Mode, Redirect, ReferrerPolicy, RequestOptions,
    Response, Snapshot,
};
pub use watch::{ChangeStream, ComparePolicy, WatchExit, WatchId, WatchInfo, WatchOptions, WatchState, Watcher};

#[cfg(test)]
mod test_utils;
