use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails,
    /// or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no models are configured or a retry setting is
    /// out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("at least one model must be configured");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, MaxTokensVariant, ProtocolKind};

    #[test]
    fn parses_minimal_model() {
        let config: Config = toml::from_str(
            r#"
            [models."claude-sonnet"]
            protocol = "anthropic"
            api_key = "sk-test"
            max_tokens = 8192
            "#,
        )
        .unwrap();

        let model = config.model("claude-sonnet").unwrap();
        assert_eq!(model.protocol, ProtocolKind::Anthropic);
        assert_eq!(model.max_tokens, Some(8192));
        assert_eq!(model.max_tokens_variant, MaxTokensVariant::MaxTokens);
    }

    #[test]
    fn parses_extra_passthrough() {
        let config: Config = toml::from_str(
            r#"
            [models."gpt-5"]
            protocol = "openai_responses"
            base_url = "https://api.openai.com/v1"
            max_tokens_variant = "max_completion_tokens"

            [models."gpt-5".extra]
            service_tier = "flex"
            "#,
        )
        .unwrap();

        let model = config.model("gpt-5").unwrap();
        assert_eq!(model.max_tokens_variant, MaxTokensVariant::MaxCompletionTokens);
        assert_eq!(
            model.extra.get("service_tier").and_then(serde_json::Value::as_str),
            Some("flex")
        );
    }

    #[test]
    fn rejects_empty_models() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_model_fields() {
        let parsed: Result<Config, _> = toml::from_str(
            r#"
            [models.m]
            protocol = "ollama"
            tempratuer = 0.5
            "#,
        );
        assert!(parsed.is_err());
    }
}
