//! HTTP request builder and its collaborators.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch          - ApiClient: fluent options and verb methods
//! ├── transport      - Transport trait and closure adapter
//! ├── http_transport - reqwest-backed default transport
//! ├── reporter       - Error reporting hook
//! └── config         - Client configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ApiClient`] | Request builder bound to one URL |
//! | [`Transport`] | Pluggable `send(url, options)` seam |
//! | [`ReqwestTransport`] | Default network transport |
//! | [`ErrorReporter`] | Sink for transport and poll failures |
//! | [`ClientConfig`] | Transport and watcher defaults |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use pollwatch_http::client::{ApiClient, ClientConfig};
//!
//! // Default configuration
//! let client = ApiClient::new("http://example.com/api");
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     request_timeout_ms: 5000,
//!     poll_interval_ms: 2000,
//!     ..Default::default()
//! };
//! let client = ApiClient::with_config("http://example.com/api", config);
//! assert_eq!(client.url(), "http://example.com/api");
//! ```
//!
//! ## Chaining Options
//!
//! ```
//! use pollwatch_http::{ApiClient, Credentials, Redirect};
//!
//! let mut client = ApiClient::new("http://example.com/api");
//! client
//!     .set_credentials(Credentials::Include)
//!     .set_redirect(Redirect::Manual)
//!     .add_header("Accept", "application/json");
//!
//! assert_eq!(client.redirect(), Redirect::Manual);
//! assert!(client.headers().contains("accept"));
//! ```

mod config;
mod fetch;
mod http_transport;
mod reporter;
mod transport;

pub use config::ClientConfig;
pub use fetch::{ApiClient, RequestSettings};
pub use http_transport::ReqwestTransport;
pub use reporter::{ErrorReporter, NoopReporter, TracingReporter};
pub use transport::{from_fn, FnTransport, Transport};
