//! The request builder.
//!
//! [`ApiClient`] is bound to a single URL. Its transport options (mode, cache,
//! credentials, headers, redirect, referrer policy) are set through chaining setters and
//! persist across calls; each verb method only adds the method and, where allowed, a
//! JSON body.
//!
//! # Examples
//!
//! ## Configure and send
//!
//! ```ignore
//! use pollwatch_http::{ApiClient, CacheMode, Mode};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> pollwatch_http::Result<()> {
//!     let mut api = ApiClient::new("http://example.com/api/items");
//!     api.set_mode(Mode::SameOrigin)
//!         .set_cache(CacheMode::Reload)
//!         .add_header("Accept", "application/json");
//!
//!     let response = api.post(&json!({ "name": "widget" })).await?;
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom transport
//!
//! ```ignore
//! use pollwatch_http::{ApiClient, Response};
//! use pollwatch_http::client::from_fn;
//!
//! let api = ApiClient::with_transport(
//!     "memory://items",
//!     from_fn(|_url, _options| async { Ok(Response::new(200, "[]")) }),
//! );
//! ```

use super::config::ClientConfig;
use super::http_transport::ReqwestTransport;
use super::reporter::{ErrorReporter, TracingReporter};
use super::transport::Transport;
use crate::error::Result;
use crate::protocol::Headers;
use crate::types::{
    CacheMode, Credentials, Method, Mode, Redirect, ReferrerPolicy, RequestOptions, Response,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Options that persist across calls on one [`ApiClient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSettings {
    /// Request mode.
    pub mode: Mode,
    /// Cache policy.
    pub cache: CacheMode,
    /// Credentials policy.
    pub credentials: Credentials,
    /// Request headers.
    pub headers: Headers,
    /// Redirect policy.
    pub redirect: Redirect,
    /// Referrer policy.
    pub referrer_policy: ReferrerPolicy,
}

/// Fluent HTTP request builder bound to one URL.
///
/// Cloning an `ApiClient` yields a handle to the same settings: a setter called through
/// any clone affects every later call made through all of them. The
/// [`Watcher`](crate::Watcher) relies on this to poll with the caller's current headers.
#[derive(Clone)]
pub struct ApiClient {
    url: Arc<str>,
    transport: Arc<dyn Transport>,
    settings: Arc<RwLock<RequestSettings>>,
    reporter: Arc<dyn ErrorReporter>,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    /// Create a client for `url` using the reqwest transport and default configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(url, ClientConfig::default())
    }

    /// Create a client for `url` using the reqwest transport built from `config`.
    pub fn with_config(url: impl Into<String>, config: ClientConfig) -> Self {
        let transport = ReqwestTransport::with_config(config.clone());
        Self::build(url.into(), Arc::new(transport), config)
    }

    /// Create a client for `url` that sends through `transport`.
    pub fn with_transport(url: impl Into<String>, transport: impl Transport + 'static) -> Self {
        Self::build(url.into(), Arc::new(transport), ClientConfig::default())
    }

    fn build(url: String, transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        ApiClient {
            url: url.into(),
            transport,
            settings: Arc::new(RwLock::new(RequestSettings::default())),
            reporter: Arc::new(TracingReporter),
            config: Arc::new(config),
        }
    }

    /// Replace the error reporter.
    pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Replace the configuration. The transport is left untouched.
    pub fn with_client_config(mut self, config: ClientConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    // ========== Setters ==========

    /// Set the request mode.
    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        self.settings.write().mode = mode;
        self
    }

    /// Set the cache policy.
    pub fn set_cache(&mut self, cache: CacheMode) -> &mut Self {
        self.settings.write().cache = cache;
        self
    }

    /// Set the credentials policy.
    pub fn set_credentials(&mut self, credentials: Credentials) -> &mut Self {
        self.settings.write().credentials = credentials;
        self
    }

    /// Set a header, replacing every value already stored under `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.settings.write().headers.set(name, value);
        self
    }

    /// Add a value under `name`, keeping the existing ones.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.settings.write().headers.append(name, value);
        self
    }

    /// Set the redirect policy.
    pub fn set_redirect(&mut self, redirect: Redirect) -> &mut Self {
        self.settings.write().redirect = redirect;
        self
    }

    /// Set the referrer policy.
    pub fn set_referrer_policy(&mut self, policy: ReferrerPolicy) -> &mut Self {
        self.settings.write().referrer_policy = policy;
        self
    }

    // ========== Accessors ==========

    /// The target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request mode.
    pub fn mode(&self) -> Mode {
        self.settings.read().mode
    }

    /// The cache policy.
    pub fn cache(&self) -> CacheMode {
        self.settings.read().cache
    }

    /// The credentials policy.
    pub fn credentials(&self) -> Credentials {
        self.settings.read().credentials
    }

    /// A copy of the configured headers.
    pub fn headers(&self) -> Headers {
        self.settings.read().headers.clone()
    }

    /// The redirect policy.
    pub fn redirect(&self) -> Redirect {
        self.settings.read().redirect
    }

    /// The referrer policy.
    pub fn referrer_policy(&self) -> ReferrerPolicy {
        self.settings.read().referrer_policy
    }

    /// A copy of every persistent option.
    pub fn settings(&self) -> RequestSettings {
        self.settings.read().clone()
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn reporter(&self) -> Arc<dyn ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    // ========== Sending ==========

    /// The options record a call with `method` and `data` would hand to the transport.
    ///
    /// `data` is serialized to JSON unless `method` is `GET` or `HEAD`, in which case it
    /// is ignored and no body is attached. Body methods called without data send `null`.
    pub fn build_options<T: Serialize + ?Sized>(
        &self,
        method: Method,
        data: Option<&T>,
    ) -> Result<RequestOptions> {
        let body = if method.allows_body() {
            Some(match data {
                Some(data) => serde_json::to_string(data)?,
                None => "null".to_string(),
            })
        } else {
            None
        };

        let settings = self.settings.read();
        Ok(RequestOptions {
            method,
            mode: settings.mode,
            cache: settings.cache,
            credentials: settings.credentials,
            headers: settings.headers.clone(),
            redirect: settings.redirect,
            referrer_policy: settings.referrer_policy,
            body,
        })
    }

    /// Send one request through the transport.
    ///
    /// `data` becomes the JSON body of every method but `GET` and `HEAD`; `None` is sent
    /// as `null`. Transport failures are handed to the error reporter and then returned.
    pub async fn send<T: Serialize + ?Sized>(&self, method: Method, data: Option<&T>) -> Result<Response> {
        let options = self.build_options(method, data)?;
        if self.config.enable_logging {
            tracing::debug!(
                method = %method,
                url = %self.url,
                has_body = options.body.is_some(),
                "sending request"
            );
        }

        match self.transport.send(&self.url, options).await {
            Ok(response) => Ok(response),
            Err(e) => {
                self.reporter.report(&e);
                Err(e)
            }
        }
    }

    /// `GET` request.
    pub async fn get(&self) -> Result<Response> {
        self.send::<()>(Method::Get, None).await
    }

    /// `HEAD` request.
    pub async fn head(&self) -> Result<Response> {
        self.send::<()>(Method::Head, None).await
    }

    /// `POST` request with `data` as the JSON body.
    pub async fn post<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Post, Some(data)).await
    }

    /// `PUT` request with `data` as the JSON body.
    pub async fn put<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Put, Some(data)).await
    }

    /// `DELETE` request with `data` as the JSON body.
    pub async fn delete<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Delete, Some(data)).await
    }

    /// `CONNECT` request with `data` as the JSON body.
    pub async fn connect<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Connect, Some(data)).await
    }

    /// `OPTIONS` request with `data` as the JSON body.
    pub async fn options<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Options, Some(data)).await
    }

    /// `TRACE` request with `data` as the JSON body.
    pub async fn trace<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Trace, Some(data)).await
    }

    /// `PATCH` request with `data` as the JSON body.
    pub async fn patch<T: Serialize + ?Sized>(&self, data: &T) -> Result<Response> {
        self.send(Method::Patch, Some(data)).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("url", &self.url)
            .field("settings", &*self.settings.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::test_utils::{CollectingReporter, ScriptedTransport};
    use serde_json::json;

    fn client() -> (ApiClient, ScriptedTransport) {
        let transport = ScriptedTransport::default();
        (ApiClient::with_transport(":http:", transport.clone()), transport)
    }

    #[test]
    fn test_url_and_defaults() {
        let (api, _) = client();
        assert_eq!(api.url(), ":http:");
        assert_eq!(api.mode(), Mode::Cors);
        assert_eq!(api.cache(), CacheMode::NoCache);
        assert_eq!(api.credentials(), Credentials::Omit);
        assert_eq!(api.redirect(), Redirect::Follow);
        assert_eq!(api.referrer_policy(), ReferrerPolicy::NoReferrer);
        assert!(api.headers().is_empty());
    }

    #[tokio::test]
    async fn test_every_method_reaches_transport() {
        let (api, transport) = client();
        let data = json!({"foo": "foo", "bar": "bar"});

        api.get().await.unwrap();
        api.head().await.unwrap();
        api.post(&data).await.unwrap();
        api.put(&data).await.unwrap();
        api.delete(&data).await.unwrap();
        api.connect(&data).await.unwrap();
        api.options(&data).await.unwrap();
        api.trace(&data).await.unwrap();
        api.patch(&data).await.unwrap();

        let calls = transport.calls();
        let methods: Vec<_> = calls.iter().map(|(_, o)| o.method).collect();
        assert_eq!(methods, Method::ALL.to_vec());
        assert!(calls.iter().all(|(url, _)| url == ":http:"));
    }

    #[tokio::test]
    async fn test_body_only_for_body_methods() {
        let (api, transport) = client();
        let data = json!({"message": "Work for food"});

        for method in Method::ALL {
            api.send(*method, Some(&data)).await.unwrap();
        }

        for (_, options) in transport.calls() {
            if options.method.allows_body() {
                assert_eq!(options.body.as_deref(), Some(r#"{"message":"Work for food"}"#));
            } else {
                assert_eq!(options.body, None, "{} must not carry a body", options.method);
            }
        }
    }

    #[tokio::test]
    async fn test_missing_data_is_sent_as_null() {
        let (api, transport) = client();
        api.send::<()>(Method::Post, None).await.unwrap();
        api.send::<()>(Method::Get, None).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].1.body.as_deref(), Some("null"));
        assert_eq!(calls[1].1.body, None);
    }

    #[tokio::test]
    async fn test_setters_persist_across_calls() {
        let (mut api, transport) = client();
        api.set_mode(Mode::SameOrigin)
            .set_cache(CacheMode::OnlyIfCached)
            .set_credentials(Credentials::Include)
            .set_redirect(Redirect::Manual)
            .set_referrer_policy(ReferrerPolicy::Client);

        assert_eq!(api.mode(), Mode::SameOrigin);
        assert_eq!(api.cache(), CacheMode::OnlyIfCached);
        assert_eq!(api.credentials(), Credentials::Include);
        assert_eq!(api.redirect(), Redirect::Manual);
        assert_eq!(api.referrer_policy(), ReferrerPolicy::Client);

        api.get().await.unwrap();
        api.post(&json!({})).await.unwrap();

        for (_, options) in transport.calls() {
            assert_eq!(options.mode, Mode::SameOrigin);
            assert_eq!(options.cache, CacheMode::OnlyIfCached);
            assert_eq!(options.credentials, Credentials::Include);
            assert_eq!(options.redirect, Redirect::Manual);
            assert_eq!(options.referrer_policy, ReferrerPolicy::Client);
        }
    }

    #[tokio::test]
    async fn test_add_then_set_header() {
        let (mut api, transport) = client();
        api.add_header("Content-Type", "foo/bar")
            .add_header("Content-Type", "application/insomnia");
        api.post(&json!({})).await.unwrap();

        api.set_header("Content-Type", "application/javascript");
        api.get().await.unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0].1.headers.get_all("content-type"),
            vec!["foo/bar", "application/insomnia"]
        );
        assert_eq!(calls[1].1.headers.get_all("content-type"), vec!["application/javascript"]);
    }

    #[tokio::test]
    async fn test_clones_share_settings() {
        let (mut api, transport) = client();
        let other = api.clone();
        api.set_header("Authorization", "Bearer t");
        other.get().await.unwrap();
        assert_eq!(
            transport.calls()[0].1.headers.get("authorization").as_deref(),
            Some("Bearer t")
        );
    }

    #[test]
    fn test_identical_calls_build_identical_options() {
        let (mut api, _) = client();
        api.add_header("X-Trace", "1");
        let first = api.build_options(Method::Put, Some(&json!({"a": 1}))).unwrap();
        let second = api.build_options(Method::Put, Some(&json!({"a": 2}))).unwrap();
        assert_eq!(
            RequestOptions { body: None, ..first.clone() },
            RequestOptions { body: None, ..second }
        );
        assert_eq!(first, api.build_options(Method::Put, Some(&json!({"a": 1}))).unwrap());
    }

    #[tokio::test]
    async fn test_transport_error_is_reported_and_returned() {
        let transport = ScriptedTransport::default();
        transport.push_err(ApiError::Transport("connection refused".into()));
        let reporter = CollectingReporter::default();
        let api = ApiClient::with_transport("http://a.test", transport).with_reporter(reporter.clone());

        let err = api.get().await.unwrap_err();
        assert_eq!(err, ApiError::Transport("connection refused".into()));
        assert_eq!(reporter.messages(), vec!["transport error: connection refused".to_string()]);
    }
}
