//! Programmatic configuration builder for integration tests

use prism_config::Config;

/// Builder assembling a prism configuration as TOML
pub struct ConfigBuilder {
    models: Vec<String>,
    retry: Option<String>,
}

impl ConfigBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            retry: None,
        }
    }

    /// Add a model speaking `protocol` against `base_url`
    pub fn with_model(mut self, id: &str, protocol: &str, base_url: &str) -> Self {
        self.models.push(format!(
            r#"
            [models."{id}"]
            protocol = "{protocol}"
            base_url = "{base_url}"
            api_key = "test-key"
            "#
        ));
        self
    }

    /// Add a model with extra TOML lines appended to its table
    pub fn with_model_lines(mut self, id: &str, protocol: &str, base_url: &str, lines: &str) -> Self {
        self.models.push(format!(
            r#"
            [models."{id}"]
            protocol = "{protocol}"
            base_url = "{base_url}"
            api_key = "test-key"
            {lines}
            "#
        ));
        self
    }

    /// Configure retry behavior
    pub fn with_retry(mut self, max_attempts: u32, interval_ms: u64) -> Self {
        self.retry = Some(format!(
            r"
            [retry]
            max_attempts = {max_attempts}
            interval_ms = {interval_ms}
            "
        ));
        self
    }

    /// Parse the accumulated TOML into a configuration
    pub fn build(self) -> Config {
        let mut toml = self.models.join("\n");
        if let Some(retry) = self.retry {
            toml.push_str(&retry);
        }
        toml::from_str(&toml).expect("valid test config")
    }
}
