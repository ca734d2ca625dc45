use std::collections::HashSet;

use serde::Deserialize;

/// Status codes retried unless overridden
const DEFAULT_RETRYABLE: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry behavior for the initial HTTP attempt of every request
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Whether failed attempts are retried at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed wait between attempts, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Additional status codes to retry, unioned with the default set
    #[serde(default)]
    pub extra_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            extra_status_codes: Vec::new(),
        }
    }
}

impl RetryConfig {
    /// The full set of retryable status codes (defaults plus extras)
    pub fn retryable_status_codes(&self) -> HashSet<u16> {
        DEFAULT_RETRYABLE
            .iter()
            .chain(self.extra_status_codes.iter())
            .copied()
            .collect()
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_interval_ms() -> u64 {
    2000
}
