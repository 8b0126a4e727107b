use std::fmt;
use std::time::Duration;

use cryptoscore_layout::ProgramIds;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Network the client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Mainnet,
    #[default]
    Devnet,
    Localnet,
    Custom(String),
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Mainnet => f.write_str("https://api.mainnet-beta.solana.com"),
            Cluster::Devnet => f.write_str("https://api.devnet.solana.com"),
            Cluster::Localnet => f.write_str("http://127.0.0.1:8899"),
            Cluster::Custom(url) => f.write_str(url),
        }
    }
}

/// Bounded exponential backoff for transient transport failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never backs off.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_delay_ms`.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_ms = (self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp)) as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub cluster: Cluster,
    pub programs: ProgramIds,
    pub retry: RetryPolicy,
    /// Upper bound on confirmation polling per submission.
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Automatic re-sign-and-resubmit rounds after a blockhash expires.
    pub max_blockhash_retries: u32,
    /// Concurrent requests during batch fetches.
    pub fetch_concurrency: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::default(),
            programs: ProgramIds::default(),
            retry: RetryPolicy::default(),
            confirm_timeout_secs: 60,
            poll_interval_ms: 500,
            max_blockhash_retries: 3,
            fetch_concurrency: 8,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.fetch_concurrency == 0 {
            return Err(ClientError::Config("fetch_concurrency must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClientError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.confirm_timeout_secs == 0 {
            return Err(ClientError::Config("confirm_timeout_secs must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config("poll_interval_ms must be positive".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(ClientError::Config(
                "retry.backoff_multiplier must be a finite value >= 1.0".into(),
            ));
        }
        Ok(())
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
