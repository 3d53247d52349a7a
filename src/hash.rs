//! # Content Hashing
//!
//! Deterministic fingerprints of desired state, used for drift detection.
//!
//! A value is converted to JSON, written canonically (object keys sorted at
//! every depth, no whitespace), hashed with SHA-256 and encoded as URL-safe
//! base64 without padding. Two logically equal values always produce the same
//! fingerprint, whatever the iteration order of the maps they were built from.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("failed to serialize object for hashing: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fingerprint `object`
///
/// # Errors
///
/// Returns an error if `object` cannot be represented as JSON
/// (for example a map with non-string keys).
pub fn hash_object<T: Serialize + ?Sized>(object: &T) -> Result<String, HashError> {
    let value = serde_json::to_value(object)?;
    let mut canonical = String::new();
    write_canonical(&value, &mut canonical)?;

    let digest = Sha256::digest(canonical.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(digest))
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(map) => {
            // serde_json may preserve insertion order depending on enabled features
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(&map[key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}
