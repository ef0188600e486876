//! The transport seam.
//!
//! [`ApiClient`](crate::ApiClient) never talks to the network itself: it builds a
//! [`RequestOptions`] record and hands it, together with the URL, to a [`Transport`].
//! The crate ships [`ReqwestTransport`](super::ReqwestTransport); anything else can be
//! plugged in by implementing the trait or by wrapping an async closure with
//! [`from_fn`].
//!
//! ```ignore
//! use pollwatch_http::{ApiClient, Response};
//! use pollwatch_http::client::from_fn;
//!
//! let echo = from_fn(|url, options| async move {
//!     Ok(Response::new(200, format!("{} {}", options.method, url)))
//! });
//! let client = ApiClient::with_transport("http://example.com", echo);
//! ```

use crate::error::Result;
use crate::types::{RequestOptions, Response};
use async_trait::async_trait;
use std::future::Future;

/// Performs one HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request to `url` described by `options` and return the raw response.
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response>;
}

/// A [`Transport`] backed by an async closure. Built with [`from_fn`].
#[derive(Clone)]
pub struct FnTransport<F> {
    f: F,
}

/// Wrap an async function `(url, options) -> Result<Response>` as a transport.
pub fn from_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(String, RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    FnTransport { f }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(String, RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send,
{
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response> {
        (self.f)(url.to_string(), options).await
    }
}
