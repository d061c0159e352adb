//! Canonical payload serialization and digest for idempotency comparison

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{ReconcileError, ReconcileResult};

/// Serialize a payload to canonical JSON
///
/// The payload is routed through `serde_json::Value`, whose object
/// representation is a sorted map, so two logically equal payloads hash
/// identically regardless of field order at the source.
pub fn canonical_json<T: Serialize>(payload: &T) -> ReconcileResult<String> {
    let value = serde_json::to_value(payload)
        .map_err(|e| ReconcileError::InvalidRequest(format!("unserializable payload: {e}")))?;
    serde_json::to_string(&value)
        .map_err(|e| ReconcileError::InvalidRequest(format!("unserializable payload: {e}")))
}

/// SHA-256 hex digest of the canonical form of a payload
pub fn params_hash<T: Serialize>(payload: &T) -> ReconcileResult<String> {
    let canonical = canonical_json(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
