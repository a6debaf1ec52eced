// Stable cache keys for advisory requests
//
// Parameters are serialized to JSON with object keys sorted at every depth,
// hashed with SHA-256 and truncated, then prefixed with the request kind.

use crate::advisory::error::AdvisoryError;
use crate::advisory::template::RequestKind;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in a key
pub const KEY_HASH_LEN: usize = 32;

/// Rebuild a JSON value with object keys in sorted order
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Canonical JSON text of any serializable parameters
pub fn canonical_json<T: Serialize>(params: &T) -> Result<String, AdvisoryError> {
    let value = serde_json::to_value(params)
        .map_err(|e| AdvisoryError::Internal(format!("cannot serialize parameters: {}", e)))?;
    serde_json::to_string(&canonicalize(value))
        .map_err(|e| AdvisoryError::Internal(format!("cannot serialize parameters: {}", e)))
}

/// Cache key `"<kind>:<hash>"` for a request
pub fn cache_key<T: Serialize>(kind: RequestKind, params: &T) -> Result<String, AdvisoryError> {
    let canonical = canonical_json(params)?;
    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    Ok(format!("{}:{}", kind.as_str(), &digest[..KEY_HASH_LEN]))
}
