//! Ordered, case-insensitive header multi-map.
//!
//! [`Headers`] follows the semantics of the fetch `Headers` container:
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`Headers::set`] | Drops every value stored under the name, then stores one |
//! | [`Headers::append`] | Adds another value under the name |
//! | [`Headers::get`] | All values for the name joined with `", "` |
//! | [`Headers::get_all`] | Every value for the name, in insertion order |
//!
//! Names are stored lowercased; values are stored verbatim. Validation against the
//! HTTP grammar happens in the transport, not here.
//!
//! # Examples
//!
//! ```
//! use pollwatch_http::Headers;
//!
//! let mut headers = Headers::new();
//! headers.append("Accept", "text/html");
//! headers.append("accept", "application/json");
//! assert_eq!(headers.get_all("ACCEPT"), vec!["text/html", "application/json"]);
//!
//! headers.set("Accept", "*/*");
//! assert_eq!(headers.get("accept").as_deref(), Some("*/*"));
//! ```

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered multi-map from header name to header values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every value stored under `name` with `value`.
    ///
    /// The new entry takes the position of the first removed one, so overwriting a
    /// header does not reorder the set.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let key = normalize(name);
        let value = value.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((key, value)),
        }
    }

    /// Store an additional value under `name`.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((normalize(name), value.into()));
    }

    /// Remove every value stored under `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let key = normalize(name);
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        before != self.entries.len()
    }

    /// All values for `name` joined with `", "`, or `None` if the name is absent.
    pub fn get(&self, name: &str) -> Option<String> {
        let values = self.get_all(name);
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let key = normalize(name);
        self.entries
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Whether at least one value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        let key = normalize(name);
        self.entries.iter().any(|(k, _)| *k == key)
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of stored values (a name with two values counts twice).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no values.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Names are only lowercased; a malformed name is kept as given and rejected by the transport.
fn normalize(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

// Serialized as a list of `[name, value]` pairs so repeated names survive.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for entry in &self.entries {
            seq.serialize_element(entry)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pairs = Vec::<(String, String)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
