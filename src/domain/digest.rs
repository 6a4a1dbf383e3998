//! Record digests
//!
//! A digest is a SHA-256 fingerprint over a record's canonical JSON form,
//! used to detect change without deep comparison. Two independent digests
//! are kept per item: `index_digest` covers exactly the fields submitted to
//! the search backend, `data_digest` covers all relational fields. Their
//! independence is what lets a database-only change skip reindexing.

use serde::Serialize;
use sha2::{Digest as _, Sha256};

/// The pair of fingerprints stored with each item row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub index_digest: String,
    pub data_digest: String,
}

/// Fingerprint any serializable value. Struct field order is fixed by the
/// type definition, so identical logical content always hashes identically.
pub fn digest_of<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).expect("digest serialization cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(&json);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_content_same_digest() {
        let a = json!({"title": "On Digests", "year": 2021});
        let b = json!({"title": "On Digests", "year": 2021});
        assert_eq!(digest_of(&a), digest_of(&b));
    }

    #[test]
    fn different_content_different_digest() {
        let a = json!({"title": "On Digests", "year": 2021});
        let b = json!({"title": "On Digests", "year": 2022});
        assert_ne!(digest_of(&a), digest_of(&b));
    }
}
