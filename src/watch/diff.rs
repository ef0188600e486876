//! Shallow, baseline-driven record diff.
//!
//! Only keys already present in the baseline are compared; keys that appear only in the
//! remote record are ignored. A baseline key missing from the remote record is a
//! key-compatibility failure and leaves the baseline untouched.

use crate::error::{ApiError, Result};
use crate::types::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a baseline value is compared with its freshly fetched counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparePolicy {
    /// Identity-style comparison: scalars compare by value (numbers numerically), while
    /// objects and arrays always count as changed because every fetch yields a new one.
    #[default]
    Strict,
    /// Structural comparison of nested objects and arrays. Opt-in; it reports fewer
    /// changes than `Strict` for resources with nested fields.
    Deep,
}

impl ComparePolicy {
    /// Whether `fresh` counts as a change of `current`.
    pub fn differs(&self, current: &Value, fresh: &Value) -> bool {
        match self {
            ComparePolicy::Deep => current != fresh,
            ComparePolicy::Strict => match (current, fresh) {
                (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => true,
                (Value::Number(a), Value::Number(b)) => a != b && a.as_f64() != b.as_f64(),
                _ => current != fresh,
            },
        }
    }
}

/// Copy every changed baseline field from `remote` into `baseline`.
///
/// Returns the changed keys in baseline order. Fails with
/// [`ApiError::KeyCompatibility`] naming the first baseline key absent from `remote`;
/// in that case nothing is modified.
pub fn apply_remote(baseline: &mut Snapshot, remote: &Snapshot, policy: ComparePolicy) -> Result<Vec<String>> {
    if let Some(missing) = baseline.keys().find(|key| !remote.contains_key(*key)) {
        return Err(ApiError::KeyCompatibility { key: missing.clone() });
    }

    let mut changed = Vec::new();
    for (key, value) in baseline.iter_mut() {
        if let Some(fresh) = remote.get(key) {
            if policy.differs(value, fresh) {
                *value = fresh.clone();
                changed.push(key.clone());
            }
        }
    }
    Ok(changed)
}
