//! Block layer errors

use tessera_core::Cid;

/// Errors from fetching or storing blocks
///
/// `Clone` so that a single in-flight fetch can hand the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// Fetched bytes do not match the CID
    #[error("integrity check failed for {cid}: {reason}")]
    Integrity {
        /// Requested CID
        cid: Cid,
        /// Mismatch or unsupported hash
        reason: String,
    },

    /// The request did not complete in time
    #[error("timed out fetching {cid} after {timeout_ms}ms")]
    Timeout {
        /// Requested CID
        cid: Cid,
        /// Per-attempt limit
        timeout_ms: u64,
    },

    /// Network failure before a response arrived
    #[error("connection error fetching {cid}: {reason}")]
    Connection {
        /// Requested CID
        cid: Cid,
        /// Transport message
        reason: String,
    },

    /// The gateway answered with a non-success status
    #[error("gateway returned HTTP {status} for {cid}")]
    Status {
        /// Requested CID
        cid: Cid,
        /// HTTP status code
        status: u16,
    },

    /// The fetcher could not be set up
    #[error("invalid fetcher configuration: {0}")]
    Config(String),

    /// A local store failed
    #[error("block storage error: {0}")]
    Storage(String),
}

impl BlockError {
    /// Whether another attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BlockError::Timeout { .. } | BlockError::Connection { .. } | BlockError::Status { .. }
        )
    }

    /// Whether this is an integrity violation
    pub fn is_integrity(&self) -> bool {
        matches!(self, BlockError::Integrity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Block;

    #[test]
    fn test_integrity_is_never_retryable() {
        let cid = *Block::raw(b"x".to_vec()).unwrap().cid();
        let integrity = BlockError::Integrity {
            cid,
            reason: "mismatch".into(),
        };
        assert!(!integrity.is_retryable());
        assert!(integrity.is_integrity());

        assert!(BlockError::Status { cid, status: 502 }.is_retryable());
        assert!(BlockError::Timeout {
            cid,
            timeout_ms: 10
        }
        .is_retryable());
        assert!(!BlockError::Storage("disk".into()).is_retryable());
    }
}
