#![allow(clippy::must_use_candidate)]

pub mod model;
pub mod retry;

mod loader;

use indexmap::IndexMap;
use serde::Deserialize;

pub use model::{MaxTokensVariant, ModelConfig, ProtocolKind, ReasoningConfig, SamplingConfig};
pub use retry::RetryConfig;

/// Top-level prism configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model configurations keyed by model id
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
    /// Retry behavior applied to every request
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Look up a model configuration by id
    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.get(id)
    }
}
