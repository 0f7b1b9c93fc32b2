//! Canonical serialization for deterministic fingerprints.
//!
//! Run outputs are fingerprinted so two runs over the same series can be
//! compared without diffing the export tables.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap or sorted Vecs in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    let bytes = to_canonical_bytes(value)?;
    Ok(xxh64(&bytes, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Entry {
        timestamp: String,
        cluster_id: i64,
        dynamic_id: i64,
    }

    #[test]
    fn test_determinism() {
        let e = Entry {
            timestamp: "1998".to_string(),
            cluster_id: 3,
            dynamic_id: 1,
        };

        let h1 = canonical_hash(&e).unwrap();
        let h2 = canonical_hash(&e).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hex_width() {
        let hex = canonical_hash_hex(&vec![1, 2, 3]).unwrap();
        assert_eq!(hex.len(), 16);
        assert_ne!(hex, canonical_hash_hex(&vec![3, 2, 1]).unwrap());
    }
}
