//! Canonical cache keys

use std::fmt;

use serde_json::Map;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::query::DataSourceQuery;

/// Key identifying a cached response.
///
/// Built either from a caller-supplied key function or from the SHA-256 of
/// the query's canonical JSON, in which object keys are sorted at every
/// level so that key order never causes a false miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an already-computed key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the canonical key for a query.
    pub fn from_query(query: &DataSourceQuery) -> Self {
        // Serializing plain data structures into a Value cannot fail.
        let value = serde_json::to_value(query).unwrap_or(Value::Null);
        Self::from_value(&value)
    }

    /// Derives the canonical key for an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        let canonical = canonical_json(value);
        let digest = Sha256::digest(canonical.as_bytes());
        let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
        Self(hex)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serializes `value` with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
    canonicalize(value).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
