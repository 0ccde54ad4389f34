//! Stable content hashes for serializable state.
//!
//! Two peers that replay the same inputs from the same seed must end up with
//! equal fingerprints; a mismatch means the simulations diverged.

use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 (hex) of the JSON encoding of `value`.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(value)?;
    Ok(fingerprint_bytes(&bytes))
}
