//! Operations carried by clock events
//!
//! The clock never interprets an operation; it only needs to encode and
//! decode it. Any serde type qualifies. `String` is the plain-value case and
//! [`KvOp`] is a structured key/value op for callers that keep a map.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use tessera_core::Cid;

/// Anything that can ride inside an event
pub trait Operation: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {}

impl<T> Operation for T where
    T: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static
{
}

/// A key/value mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvOp {
    /// Set `key` to `value`
    Put {
        /// Key
        key: String,
        /// Linked value
        value: Cid,
    },
    /// Remove `key`
    Del {
        /// Key
        key: String,
    },
    /// Apply several ops in order
    Batch(Vec<KvOp>),
}

impl KvOp {
    /// Apply the op to `map`
    pub fn apply(&self, map: &mut BTreeMap<String, Cid>) {
        match self {
            KvOp::Put { key, value } => {
                map.insert(key.clone(), *value);
            }
            KvOp::Del { key } => {
                map.remove(key);
            }
            KvOp::Batch(ops) => ops.iter().for_each(|op| op.apply(map)),
        }
    }
}
