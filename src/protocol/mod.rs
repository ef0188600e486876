//! Wire-level pieces shared by the client and the watcher.
//!
//! - [`Headers`] - the ordered header multi-map carried in every options record
//! - [`constants`] - header names and timing defaults

mod headers;

pub use headers::Headers;

/// Protocol constants.
pub mod constants {
    use std::time::Duration;

    /// Default delay between two polls of a watch task.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

    /// Shortest poll interval a watch task accepts; smaller values are raised to it.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Header names the transport reads or writes.
    pub mod headers {
        /// `Cache-Control`
        pub const CACHE_CONTROL: &str = "cache-control";
        /// `Pragma`
        pub const PRAGMA: &str = "pragma";
        /// `Content-Type`
        pub const CONTENT_TYPE: &str = "content-type";
    }

    /// Content type attached to serialized request bodies.
    pub const JSON_CONTENT_TYPE: &str = "application/json";
}
