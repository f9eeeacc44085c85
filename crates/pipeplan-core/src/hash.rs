//! blake3 fingerprints for advice reports and graph shapes.
//!
//! A report and a graph hash the same way: serialize to JSON, then blake3 the
//! bytes. Two runs agree on a fingerprint only when every decision agreed.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Lower-case hex, 64 characters.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<blake3::Hash> for Hash256 {
    fn from(h: blake3::Hash) -> Self {
        Hash256(*h.as_bytes())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    blake3::hash(bytes).into()
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Fingerprint of `v`'s JSON form.
///
/// Only stable for values with a fixed field order: structs, `BTreeMap`, `Vec`.
/// A `HashMap` anywhere inside would change the bytes between runs.
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256> {
    Ok(hash_bytes(&serde_json::to_vec(v)?))
}
