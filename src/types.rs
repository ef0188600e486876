//! Request option enums, the options record handed to transports, and responses.
//!
//! Each option enum renders to the exact string a fetch-style transport expects
//! (`"no-cors"`, `"only-if-cached"`, ...) through `Display`, `FromStr` and serde.
//!
//! | Option | Values | Default |
//! |--------|--------|---------|
//! | [`Mode`] | `no-cors`, `cors`, `same-origin` | `cors` |
//! | [`CacheMode`] | `default`, `no-cache`, `reload`, `force-cache`, `only-if-cached` | `no-cache` |
//! | [`Credentials`] | `include`, `same-origin`, `omit` | `omit` |
//! | [`Redirect`] | `manual`, `follow`, `error` | `follow` |
//! | [`ReferrerPolicy`] | `no-referrer`, `client` | `no-referrer` |

use crate::error::{ApiError, Result};
use crate::protocol::Headers;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A flat JSON object: the shape of a watch baseline and of each polled record.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;

/// Convert any serializable value into a [`Snapshot`].
///
/// Fails with [`ApiError::Serialization`] unless the value serializes to a JSON object.
pub fn to_snapshot<T: Serialize + ?Sized>(value: &T) -> Result<Snapshot> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialization(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:tt ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire string for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ApiError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ApiError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// HTTP request method.
    pub enum Method as "method" {
        /// `GET`
        Get => "GET",
        /// `HEAD`
        Head => "HEAD",
        /// `POST`
        Post => "POST",
        /// `PUT`
        Put => "PUT",
        /// `DELETE`
        Delete => "DELETE",
        /// `CONNECT`
        Connect => "CONNECT",
        /// `OPTIONS`
        Options => "OPTIONS",
        /// `TRACE`
        Trace => "TRACE",
        /// `PATCH`
        Patch => "PATCH",
    }
}

impl Method {
    /// Whether a request body may be sent with this method. `GET` and `HEAD` never
    /// carry one.
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Connect => http::Method::CONNECT,
            Method::Options => http::Method::OPTIONS,
            Method::Trace => http::Method::TRACE,
            Method::Patch => http::Method::PATCH,
        }
    }
}

wire_enum! {
    /// Request mode.
    #[derive(Default)]
    pub enum Mode as "mode" {
        /// `no-cors`
        NoCors => "no-cors",
        /// `cors`
        #[default]
        Cors => "cors",
        /// `same-origin`
        SameOrigin => "same-origin",
    }
}

wire_enum! {
    /// Cache policy.
    #[derive(Default)]
    pub enum CacheMode as "cache" {
        /// `default`
        Default => "default",
        /// `no-cache`
        #[default]
        NoCache => "no-cache",
        /// `reload`
        Reload => "reload",
        /// `force-cache`
        ForceCache => "force-cache",
        /// `only-if-cached`
        OnlyIfCached => "only-if-cached",
    }
}

impl CacheMode {
    /// Whether the request must bypass intermediate caches.
    pub fn bypasses_cache(&self) -> bool {
        matches!(self, CacheMode::NoCache | CacheMode::Reload)
    }
}

wire_enum! {
    /// Credentials policy.
    #[derive(Default)]
    pub enum Credentials as "credentials" {
        /// `include`
        Include => "include",
        /// `same-origin`
        SameOrigin => "same-origin",
        /// `omit`
        #[default]
        Omit => "omit",
    }
}

wire_enum! {
    /// Redirect policy.
    #[derive(Default)]
    pub enum Redirect as "redirect" {
        /// `manual`: 3xx responses are returned as they are.
        Manual => "manual",
        /// `follow`
        #[default]
        Follow => "follow",
        /// `error`: any redirect fails the request.
        Error => "error",
    }
}

wire_enum! {
    /// Referrer policy.
    #[derive(Default)]
    pub enum ReferrerPolicy as "referrerPolicy" {
        /// `no-referrer`
        #[default]
        NoReferrer => "no-referrer",
        /// `client`
        Client => "client",
    }
}

/// The full parameter set for one HTTP call, as handed to a
/// [`Transport`](crate::client::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// HTTP method of this call.
    pub method: Method,
    /// Request mode.
    pub mode: Mode,
    /// Cache policy.
    pub cache: CacheMode,
    /// Credentials policy.
    pub credentials: Credentials,
    /// Request headers, in insertion order.
    pub headers: Headers,
    /// Redirect policy.
    pub redirect: Redirect,
    /// Referrer policy.
    pub referrer_policy: ReferrerPolicy,
    /// Serialized request data. Always `None` for `GET` and `HEAD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Raw transport response. No status interpretation is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in the order the server sent them.
    pub headers: Headers,
    /// Raw body bytes.
    pub body: Bytes,
}

impl Response {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Response {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Append a header; handy when building responses by hand.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ApiError::Serialization(format!("response body is not UTF-8: {e}")))
    }

    /// The body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
