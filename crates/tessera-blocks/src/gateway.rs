//! HTTP gateway fetcher
//!
//! Blocks are requested as `GET <base>/ipfs/<cid>?format=raw`. Each attempt
//! is bounded by a timeout that drops the in-flight request; timeouts,
//! connection failures and non-success statuses are retried under the
//! configured [`RetryPolicy`]. The body must hash to the CID's digest, and a
//! mismatch is returned at once without another attempt.

use crate::error::BlockError;
use crate::store::BlockFetcher;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tessera_core::{Block, Cid, RetryPolicy};

/// Default public gateway.
pub const DEFAULT_GATEWAY: &str = "https://w3s.link";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const RAW_BLOCK: &str = "application/vnd.ipld.raw";

/// Fetches raw blocks from an IPFS HTTP gateway
#[derive(Debug, Clone)]
pub struct GatewayFetcher {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GatewayFetcher {
    /// Fetcher for the gateway at `base`
    pub fn new(base: impl Into<String>) -> Result<Self, BlockError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BlockError::Config(e.to_string()))?;
        let base = base.into().trim_end_matches('/').to_string();
        if base.is_empty() {
            return Err(BlockError::Config("empty gateway url".into()));
        }
        Ok(Self {
            client,
            base,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Gateway base URL
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, cid: &Cid) -> String {
        format!("{}/ipfs/{cid}?format=raw", self.base)
    }

    async fn fetch_once(&self, cid: &Cid) -> Result<Vec<u8>, BlockError> {
        let connection = |e: reqwest::Error| BlockError::Connection {
            cid: *cid,
            reason: e.to_string(),
        };
        let request = async {
            let response = self
                .client
                .get(self.url(cid))
                .header(ACCEPT, RAW_BLOCK)
                .send()
                .await
                .map_err(connection)?;
            let status = response.status();
            if !status.is_success() {
                return Err(BlockError::Status {
                    cid: *cid,
                    status: status.as_u16(),
                });
            }
            let body = response.bytes().await.map_err(connection)?;
            Ok(body.to_vec())
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(BlockError::Timeout {
                cid: *cid,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl BlockFetcher for GatewayFetcher {
    async fn get(&self, cid: &Cid) -> Result<Option<Block>, BlockError> {
        let bytes = self
            .retry
            .execute_if(
                || async {
                    let result = self.fetch_once(cid).await;
                    if let Err(error) = &result {
                        tracing::debug!(
                            %cid,
                            gateway = %self.base,
                            %error,
                            "gateway attempt failed"
                        );
                    }
                    result
                },
                BlockError::is_retryable,
            )
            .await?;

        match Block::verified(*cid, bytes) {
            Ok(block) => Ok(Some(block)),
            Err(e) => {
                tracing::error!(
                    %cid,
                    gateway = %self.base,
                    error = %e,
                    "gateway returned corrupt block"
                );
                Err(BlockError::Integrity {
                    cid: *cid,
                    reason: e.to_string(),
                })
            }
        }
    }
}
