use anyhow::Result;

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{AnthropicClient, OpenAIClient};
use crate::config::RunConfig;
use crate::error::GenerationError;

/// Create the model client for a run. `--dry-run` always gets the offline mock.
pub fn create_client(config: &RunConfig) -> Result<Box<dyn LlmClient>> {
    if config.dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    match config.provider.as_str() {
        "openai" | "openai-compatible" => Ok(Box::new(OpenAIClient::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            config.max_tokens,
            config.timeout_secs,
        )?)),

        "anthropic" => Ok(Box::new(AnthropicClient::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            config.max_tokens,
            config.timeout_secs,
        )?)),

        unknown => Err(GenerationError::UnknownProvider(unknown.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliOverrides, Config};
    use crate::detector::DetectedProject;
    use std::path::Path;

    fn run_config(provider: &str, dry_run: bool) -> RunConfig {
        let cli = CliOverrides {
            api_key: Some("test-key".to_string()),
            provider: Some(provider.to_string()),
            dry_run,
            ..Default::default()
        };
        RunConfig::resolve(
            &Config::default(),
            &cli,
            &DetectedProject::default(),
            Path::new("/p"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_uses_mock() {
        let client = create_client(&run_config("openai", true)).unwrap();
        // The mock answers without any network access
        let reply = client.complete("FILE PATH: users.ts").await.unwrap();
        assert!(reply.contains("users.test.ts"));
    }

    #[test]
    fn test_create_openai_and_anthropic() {
        assert!(create_client(&run_config("openai", false)).is_ok());
        assert!(create_client(&run_config("openai-compatible", false)).is_ok());
        assert!(create_client(&run_config("anthropic", false)).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = run_config("openai", false);
        config.provider = "unknown_provider".to_string();
        let err = create_client(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
