//! Client configuration
//!
//! Everything the protocol needs at startup lives in one [`ClockConfig`]
//! value: gateway, cache and the remotes to fan out to. It loads from TOML,
//! can be overridden from `TESSERA_*` environment variables, and is checked
//! by [`ClockConfig::validate`] before a client is built from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tessera_authorization::Did;
use tessera_core::{BackoffStrategy, RetryPolicy};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "TESSERA_";

/// Well-known remote used when none are configured
pub const DEFAULT_REMOTE_DID: &str = "did:web:clock.web3.storage";

/// URL of [`DEFAULT_REMOTE_DID`]
pub const DEFAULT_REMOTE_URL: &str = "https://clock.web3.storage";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written
    #[error("failed to access config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid configuration
    #[error("invalid config: {0}")]
    Parse(String),

    /// The configuration could not be encoded
    #[error("failed to encode config: {0}")]
    Serialize(String),

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Retry settings for gateway fetches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_attempts: u32,
    /// First backoff delay
    pub initial_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Growth of the delay between retries
    pub strategy: BackoffStrategy,
    /// Randomize delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// The policy these settings describe
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::exponential()
            .with_strategy(self.strategy)
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_jitter(self.jitter)
    }
}

/// Block gateway settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway base URL
    pub url: String,
    /// Per-attempt timeout
    pub timeout_ms: u64,
    /// Retry policy
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: tessera_blocks::gateway::DEFAULT_GATEWAY.to_string(),
            timeout_ms: 10_000,
            retry: RetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Per-attempt timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Shared block cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached blocks
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: tessera_blocks::lru::DEFAULT_CAPACITY,
        }
    }
}

/// One remote clock service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// DID of the service
    pub did: String,
    /// Endpoint
    pub url: String,
}

impl RemoteConfig {
    /// Remote entry from its parts
    pub fn new(did: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            url: url.into(),
        }
    }

    /// The parsed service DID
    pub fn parse_did(&self) -> Result<Did, ConfigError> {
        Did::parse(&self.did).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Block gateway
    pub gateway: GatewayConfig,
    /// Block cache
    pub cache: CacheConfig,
    /// Remote clock services
    pub remotes: Vec<RemoteConfig>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            cache: CacheConfig::default(),
            remotes: vec![RemoteConfig::new(DEFAULT_REMOTE_DID, DEFAULT_REMOTE_URL)],
        }
    }
}

impl ClockConfig {
    /// Load and validate a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            remotes = config.remotes.len(),
            "loaded clock config"
        );
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Encode as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Write as TOML to `path`
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TESSERA_*` overrides from the process environment
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `TESSERA_*` overrides from `vars`
    ///
    /// Recognised keys: `GATEWAY_URL`, `GATEWAY_TIMEOUT_MS`,
    /// `GATEWAY_RETRY_MAX_ATTEMPTS`, `GATEWAY_RETRY_STRATEGY` and
    /// `CACHE_CAPACITY`. Others are ignored.
    pub fn merge_with_vars(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            let Some(key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "GATEWAY_URL" => self.gateway.url = value,
                "GATEWAY_TIMEOUT_MS" => self.gateway.timeout_ms = parse_number(key, &value)?,
                "GATEWAY_RETRY_MAX_ATTEMPTS" => {
                    self.gateway.retry.max_attempts = parse_number(key, &value)?;
                }
                "GATEWAY_RETRY_STRATEGY" => {
                    self.gateway.retry.strategy = parse_strategy(key, &value)?;
                }
                "CACHE_CAPACITY" => self.cache.capacity = parse_number(key, &value)?,
                _ => {}
            }
        }
        self.validate()
    }

    /// Reject configurations a client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remotes.is_empty() {
            return Err(ConfigError::Invalid("at least one remote is required".into()));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be positive".into()));
        }
        if self.gateway.timeout_ms == 0 {
            return Err(ConfigError::Invalid("gateway.timeout_ms must be positive".into()));
        }
        if !self.gateway.url.starts_with("http://") && !self.gateway.url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "gateway.url {:?} is not an http(s) URL",
                self.gateway.url
            )));
        }
        let retry = &self.gateway.retry;
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "gateway.retry.initial_delay_ms exceeds max_delay_ms".into(),
            ));
        }
        for remote in &self.remotes {
            remote.parse_did()?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{ENV_PREFIX}{key}={value:?} is not a number")))
}

fn parse_strategy(key: &str, value: &str) -> Result<BackoffStrategy, ConfigError> {
    match value {
        "fixed" => Ok(BackoffStrategy::Fixed),
        "linear" => Ok(BackoffStrategy::Linear),
        "exponential" => Ok(BackoffStrategy::Exponential),
        _ => Err(ConfigError::Invalid(format!(
            "{ENV_PREFIX}{key}={value:?} is not one of fixed, linear, exponential"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClockConfig::default();
        config.validate().unwrap();
        assert_eq!(config.gateway.url, "https://w3s.link");
        assert_eq!(config.gateway.timeout(), Duration::from_secs(10));
        assert_eq!(config.remotes[0].parse_did().unwrap().as_str(), DEFAULT_REMOTE_DID);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClockConfig::from_toml_str(
            r#"
            [cache]
            capacity = 8

            [[remotes]]
            did = "did:web:a.example"
            url = "https://a.example"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.capacity, 8);
        assert_eq!(config.gateway, GatewayConfig::default());
        assert_eq!(
            config.remotes,
            vec![RemoteConfig::new("did:web:a.example", "https://a.example")]
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            "remotes = []",
            "[cache]\ncapacity = 0",
            "[gateway]\ntimeout_ms = 0",
            "[gateway]\nurl = \"ftp://x\"",
            "[[remotes]]\ndid = \"not-a-did\"\nurl = \"https://x\"",
        ];
        for text in cases {
            assert!(
                matches!(ClockConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "{text:?} should be rejected"
            );
        }
        assert!(matches!(
            ClockConfig::from_toml_str("cache = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClockConfig::default();
        config
            .merge_with_vars([
                ("TESSERA_GATEWAY_URL".to_string(), "http://127.0.0.1:8080".to_string()),
                ("TESSERA_CACHE_CAPACITY".to_string(), "16".to_string()),
                ("OTHER_CACHE_CAPACITY".to_string(), "99".to_string()),
            ])
            .unwrap();
        assert_eq!(config.gateway.url, "http://127.0.0.1:8080");
        assert_eq!(config.cache.capacity, 16);

        let err = config
            .merge_with_vars([("TESSERA_GATEWAY_TIMEOUT_MS".to_string(), "soon".to_string())])
            .unwrap_err();
        assert!(err.to_string().contains("GATEWAY_TIMEOUT_MS"), "{err}");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 10,
            max_delay_ms: 40,
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(10));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(20));
        assert_eq!(policy.calculate_delay(10), Duration::from_millis(40));
    }

    #[test]
    fn test_retry_strategy_from_toml() {
        let config = ClockConfig::from_toml_str(
            r#"
[gateway.retry]
strategy = "linear"
initial_delay_ms = 50
max_delay_ms = 1000
"#,
        )
        .unwrap();
        assert_eq!(config.gateway.retry.strategy, BackoffStrategy::Linear);

        let policy = config.gateway.retry.policy();
        assert_eq!(policy.strategy, BackoffStrategy::Linear);
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(150));
    }

    #[test]
    fn test_retry_strategy_from_env() {
        let mut config = ClockConfig::default();
        config
            .merge_with_vars([(
                "TESSERA_GATEWAY_RETRY_STRATEGY".to_string(),
                "fixed".to_string(),
            )])
            .unwrap();
        let policy = config.gateway.retry.policy();
        assert_eq!(policy.calculate_delay(0), policy.calculate_delay(5));

        let err = config
            .merge_with_vars([(
                "TESSERA_GATEWAY_RETRY_STRATEGY".to_string(),
                "random".to_string(),
            )])
            .unwrap_err();
        assert!(err.to_string().contains("GATEWAY_RETRY_STRATEGY"), "{err}");
    }
}
