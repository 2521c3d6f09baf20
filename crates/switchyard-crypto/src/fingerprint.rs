//! Content hashing, used to normalize idempotency-key aliases before they
//! are compared or indexed (§4.A, §4.B).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A BLAKE3 content hash (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash arbitrary bytes.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash multiple chunks as if concatenated, without an intermediate
    /// allocation — used to fingerprint an idempotency key's
    /// `(plugin_instance_id, alias)` pair.
    #[must_use]
    pub fn hash_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding, used as the stored idempotency-key column value.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("fingerprint must be 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Normalize an idempotency-key alias for a given plugin instance into its
/// stored fingerprint: `blake3(plugin_instance_id || "\0" || alias)`. The
/// null-byte separator prevents two different `(instance, alias)` pairs
/// from colliding across the concatenation boundary.
#[must_use]
pub fn idempotency_fingerprint(plugin_instance_id: &str, alias: &str) -> Fingerprint {
    Fingerprint::hash_parts(&[plugin_instance_id.as_bytes(), b"\0", alias.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_fingerprint() {
        let a = idempotency_fingerprint("inst-1", "msg-42");
        let b = idempotency_fingerprint("inst-1", "msg-42");
        assert_eq!(a, b);
    }

    #[test]
    fn different_instance_different_fingerprint() {
        let a = idempotency_fingerprint("inst-1", "msg-42");
        let b = idempotency_fingerprint("inst-2", "msg-42");
        assert_ne!(a, b);
    }

    #[test]
    fn separator_prevents_boundary_collision() {
        let a = idempotency_fingerprint("inst", "1msg");
        let b = idempotency_fingerprint("inst1", "msg");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_round_trips_through_serde() {
        let fp = idempotency_fingerprint("inst-1", "msg-42");
        let json = serde_json::to_string(&fp).unwrap();
        let decoded: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, decoded);
    }
}
