//! DAG-CBOR serialization for Tessera types
//!
//! DAG-CBOR is the canonical format for every block Tessera addresses by
//! content: events, delegations, name records and archive variants.
//!
//! DAG-CBOR provides:
//! - Deterministic canonical encoding (required for stable content ids and signatures)
//! - Native links (CIDs encode as tag 42 and survive a round trip)
//! - Efficient binary encoding

use serde::{de::DeserializeOwned, Serialize};

/// Unified error type for serialization operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SerializationError {
    /// DAG-CBOR encoding/decoding error
    #[error("DAG-CBOR error: {0}")]
    DagCbor(String),

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Standard Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serialize any serde-compatible type to DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| {
        SerializationError::InvalidFormat(format!("Failed to serialize to DAG-CBOR: {e}"))
    })
}

/// Deserialize DAG-CBOR bytes to any serde-compatible type
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| SerializationError::DagCbor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestData {
        id: u64,
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_dag_cbor_roundtrip() {
        let data = TestData {
            id: 42,
            name: "test".to_string(),
            tags: vec!["tag1".to_string(), "tag2".to_string()],
        };

        let bytes = to_vec(&data).unwrap();
        let decoded: TestData = from_slice(&bytes).unwrap();

        assert_eq!(data, decoded);
    }

    #[test]
    fn test_map_key_order_is_canonical() {
        let mut forward = BTreeMap::new();
        forward.insert("zeta".to_string(), 1u8);
        forward.insert("a".to_string(), 2u8);

        let mut reverse = BTreeMap::new();
        reverse.insert("a".to_string(), 2u8);
        reverse.insert("zeta".to_string(), 1u8);

        assert_eq!(to_vec(&forward).unwrap(), to_vec(&reverse).unwrap());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result: Result<TestData> = from_slice(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(SerializationError::DagCbor(_))));
    }
}
