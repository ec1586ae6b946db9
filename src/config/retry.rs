//! Retry driver configuration

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tessera_constants::retry::DEFAULT_INITIAL_BACKOFF_MS;
use tessera_constants::retry::DEFAULT_MAX_BACKOFF_MS;
use tessera_constants::retry::MAX_CONFIGURED_ATTEMPTS;
use tessera_core::RetryPolicy;

use super::error::ConfigError;
use super::parse_env;

/// Backoff curve and limits for transactional runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Cap on the policy delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Attempts per run; unset means retry until cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Wall-clock budget per run, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RetryConfig {
    /// Apply `TESSERA_RETRY_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = parse_env(lookup, "TESSERA_RETRY_INITIAL_BACKOFF_MS")? {
            self.initial_backoff_ms = val;
        }
        if let Some(val) = parse_env(lookup, "TESSERA_RETRY_MAX_BACKOFF_MS")? {
            self.max_backoff_ms = val;
        }
        if let Some(val) = parse_env(lookup, "TESSERA_RETRY_MAX_ATTEMPTS")? {
            self.max_attempts = Some(val);
        }
        if let Some(val) = parse_env(lookup, "TESSERA_RETRY_TIMEOUT_MS")? {
            self.timeout_ms = Some(val);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::invalid("retry.initial_backoff_ms", "0", "must be greater than zero"));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.max_backoff_ms",
                self.max_backoff_ms.to_string(),
                format!("must be at least initial_backoff_ms ({})", self.initial_backoff_ms),
            ));
        }
        if let Some(attempts) = self.max_attempts {
            if attempts == 0 || attempts > MAX_CONFIGURED_ATTEMPTS {
                return Err(ConfigError::invalid(
                    "retry.max_attempts",
                    attempts.to_string(),
                    format!("must be between 1 and {MAX_CONFIGURED_ATTEMPTS}"),
                ));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::invalid("retry.timeout_ms", "0", "must be greater than zero"));
        }
        Ok(())
    }

    /// The retry policy this configuration describes.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            max_attempts: self.max_attempts,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            max_attempts: None,
            timeout_ms: None,
        }
    }
}
