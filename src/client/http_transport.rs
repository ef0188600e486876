//! Default transport built on `reqwest`.
//!
//! Maps each field of [`RequestOptions`] onto the reqwest request:
//!
//! | Option | Effect |
//! |--------|--------|
//! | `method`, `headers`, `body` | Sent as given (headers validated first) |
//! | `redirect` | `follow`: default policy, `manual`: 3xx returned, `error`: redirects fail |
//! | `referrerPolicy` | `no-referrer` disables the automatic `Referer` header |
//! | `cache` | `no-cache`/`reload` add `cache-control` and `pragma: no-cache` |
//! | `mode`, `credentials` | Browser concepts; carried but not applied |
//!
//! Redirect and referrer behavior are client-level settings in reqwest, so one client is
//! built per combination on first use and cached.

use super::config::ClientConfig;
use super::transport::Transport;
use crate::error::{ApiError, Result};
use crate::protocol::constants::{headers, JSON_CONTENT_TYPE};
use crate::protocol::Headers;
use crate::types::{Redirect, ReferrerPolicy, RequestOptions, Response};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// [`Transport`] that performs real HTTP requests with `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    config: Arc<ClientConfig>,
    clients: Arc<Mutex<HashMap<(Redirect, ReferrerPolicy), reqwest::Client>>>,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        ReqwestTransport {
            config: Arc::new(config),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the transport configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn client_for(&self, redirect: Redirect, referrer: ReferrerPolicy) -> Result<reqwest::Client> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&(redirect, referrer)) {
            return Ok(client.clone());
        }

        let policy = match redirect {
            Redirect::Follow => reqwest::redirect::Policy::default(),
            Redirect::Manual => reqwest::redirect::Policy::none(),
            Redirect::Error => {
                reqwest::redirect::Policy::custom(|attempt| attempt.error("redirect not allowed by policy"))
            }
        };

        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .referer(referrer == ReferrerPolicy::Client)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .user_agent(self.config.user_agent.as_str());

        if let Some(timeout) = self.config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        if !self.config.proxy_url.is_empty() {
            builder = builder.proxy(reqwest::Proxy::all(&self.config.proxy_url)?);
        }

        let client = builder.build()?;
        clients.insert((redirect, referrer), client.clone());
        Ok(client)
    }

    /// Validate option headers and add the ones derived from the other options.
    fn header_map(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(options.headers.len() + 2);
        for (name, value) in options.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            map.append(name, value);
        }

        if options.cache.bypasses_cache() && !map.contains_key(headers::CACHE_CONTROL) {
            map.insert(headers::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            map.insert(headers::PRAGMA, HeaderValue::from_static("no-cache"));
        }
        if options.body.is_some()
            && self.config.json_content_type
            && !map.contains_key(headers::CONTENT_TYPE)
        {
            map.insert(headers::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        Ok(map)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response> {
        let url = Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        let header_map = self.header_map(&options)?;
        let client = self.client_for(options.redirect, options.referrer_policy)?;

        let mut req_builder = client
            .request(http::Method::from(options.method), url)
            .headers(header_map);
        if let Some(body) = options.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.send().await?;
        let status = response.status().as_u16();

        let mut headers = Headers::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.append(k.as_str(), val);
            }
        }

        let body = response.bytes().await?;

        Ok(Response { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CacheMode, Credentials, Method, Mode};
    use mockito::Matcher;
    use tokio_test::assert_err;

    fn options(method: Method) -> RequestOptions {
        RequestOptions {
            method,
            mode: Mode::default(),
            cache: CacheMode::default(),
            credentials: Credentials::default(),
            headers: Headers::new(),
            redirect: Redirect::default(),
            referrer_policy: ReferrerPolicy::default(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_post_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/items")
            .match_header("x-tag", "one")
            .match_header("content-type", JSON_CONTENT_TYPE)
            .match_header("cache-control", "no-cache")
            .match_body(Matcher::JsonString(r#"{"foo":"bar"}"#.to_string()))
            .with_status(201)
            .with_header("x-server", "mock")
            .with_body("created")
            .create_async()
            .await;

        let mut opts = options(Method::Post);
        opts.headers.append("X-Tag", "one");
        opts.body = Some(r#"{"foo":"bar"}"#.to_string());

        let response = ReqwestTransport::new()
            .send(&format!("{}/items", server.url()), opts)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 201);
        assert_eq!(response.text().unwrap(), "created");
        assert_eq!(response.headers.get("x-server").as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_caller_cache_control_wins() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("cache-control", "max-age=60")
            .match_header("pragma", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        let mut opts = options(Method::Get);
        opts.cache = CacheMode::Reload;
        opts.headers.set("Cache-Control", "max-age=60");

        let response = ReqwestTransport::new().send(&server.url(), opts).await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_manual_redirect_returns_3xx() {
        let mut server = mockito::Server::new_async().await;
        let _old = server
            .mock("GET", "/old")
            .with_status(302)
            .with_header("location", "/new")
            .create_async()
            .await;

        let mut opts = options(Method::Get);
        opts.redirect = Redirect::Manual;
        let response = ReqwestTransport::new()
            .send(&format!("{}/old", server.url()), opts)
            .await
            .unwrap();

        assert_eq!(response.status, 302);
        assert_eq!(response.headers.get("location").as_deref(), Some("/new"));
    }

    #[tokio::test]
    async fn test_follow_and_error_redirects() {
        let mut server = mockito::Server::new_async().await;
        let _old = server
            .mock("GET", "/old")
            .with_status(302)
            .with_header("location", "/new")
            .expect_at_least(1)
            .create_async()
            .await;
        let _new = server
            .mock("GET", "/new")
            .with_status(200)
            .with_body("moved")
            .create_async()
            .await;

        let transport = ReqwestTransport::new();
        let url = format!("{}/old", server.url());

        let followed = transport.send(&url, options(Method::Get)).await.unwrap();
        assert_eq!(followed.text().unwrap(), "moved");

        let mut opts = options(Method::Get);
        opts.redirect = Redirect::Error;
        let err = transport.send(&url, opts).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let transport = ReqwestTransport::new();
        assert_err!(transport.send(":http:", options(Method::Get)).await);

        let mut opts = options(Method::Get);
        opts.headers.append("bad header", "x");
        let err = transport.send("http://127.0.0.1:9/", opts).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));

        let mut opts = options(Method::Get);
        opts.headers.append(" X-Tag", "x");
        let err = transport.send("http://127.0.0.1:9/", opts).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader(_)));
    }

    #[test]
    fn test_clients_are_cached_per_policy() {
        let transport = ReqwestTransport::new();
        transport.client_for(Redirect::Follow, ReferrerPolicy::NoReferrer).unwrap();
        transport.client_for(Redirect::Follow, ReferrerPolicy::NoReferrer).unwrap();
        transport.client_for(Redirect::Manual, ReferrerPolicy::Client).unwrap();
        assert_eq!(transport.clients.lock().len(), 2);
    }
}
