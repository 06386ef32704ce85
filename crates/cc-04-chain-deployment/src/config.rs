//! Committee parameters from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_COMMITTEE_SIZE: u16 = 4;
const DEFAULT_THRESHOLD: u16 = 3;
const DEFAULT_DKG_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_QUORUM_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Committee size must be at least 1")]
    EmptyCommittee,

    #[error("Threshold {threshold} out of range 1..={size}")]
    ThresholdOutOfRange { threshold: u16, size: u16 },

    #[error("Poll interval must be non-zero")]
    ZeroPollInterval,
}

/// Shape and timing of a committee deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitteeConfig {
    /// N: number of committee members.
    pub committee_size: u16,
    /// T: signatures needed for a quorum.
    pub threshold: u16,
    /// Node-side DKG timeout.
    pub dkg_timeout: Duration,
    /// Bound on waiting for the root-init request to be processed everywhere.
    pub quorum_timeout: Duration,
    /// Delay between "request processed" polls.
    pub poll_interval: Duration,
    pub description: String,
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        Self {
            committee_size: DEFAULT_COMMITTEE_SIZE,
            threshold: DEFAULT_THRESHOLD,
            dkg_timeout: Duration::from_millis(DEFAULT_DKG_TIMEOUT_MS),
            quorum_timeout: Duration::from_millis(DEFAULT_QUORUM_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            description: String::new(),
        }
    }
}

impl CommitteeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CC_COMMITTEE_SIZE`: N (default: 4)
    /// - `CC_THRESHOLD`: T (default: 3)
    /// - `CC_DKG_TIMEOUT_MS`: DKG timeout (default: 60000)
    /// - `CC_QUORUM_TIMEOUT_MS`: processing wait (default: 30000)
    /// - `CC_POLL_INTERVAL_MS`: poll delay (default: 500)
    /// - `CC_CHAIN_DESCRIPTION`: root-init description (default: empty)
    ///
    /// Unparseable values fall back to the default; call [`Self::validate`]
    /// before use.
    pub fn from_env() -> Self {
        Self {
            committee_size: parse_env("CC_COMMITTEE_SIZE").unwrap_or(DEFAULT_COMMITTEE_SIZE),
            threshold: parse_env("CC_THRESHOLD").unwrap_or(DEFAULT_THRESHOLD),
            dkg_timeout: Duration::from_millis(
                parse_env("CC_DKG_TIMEOUT_MS").unwrap_or(DEFAULT_DKG_TIMEOUT_MS),
            ),
            quorum_timeout: Duration::from_millis(
                parse_env("CC_QUORUM_TIMEOUT_MS").unwrap_or(DEFAULT_QUORUM_TIMEOUT_MS),
            ),
            poll_interval: Duration::from_millis(
                parse_env("CC_POLL_INTERVAL_MS").unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            description: env::var("CC_CHAIN_DESCRIPTION").unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.committee_size == 0 {
            return Err(ConfigError::EmptyCommittee);
        }
        if self.threshold == 0 || self.threshold > self.committee_size {
            return Err(ConfigError::ThresholdOutOfRange {
                threshold: self.threshold,
                size: self.committee_size,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
