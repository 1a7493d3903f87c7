

use std::sync::Arc;
use std::time::Duration;

use super::providers::base::{LlmProvider, LlmProviderError};
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiCompatibleProvider;
use crate::core::config::ScholarConfig;
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
        match provider {
            "ollama" => Ok(Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout,
            )?)),
            "openai" => Ok(Arc::new(OpenAiCompatibleProvider::new(
                base_url,
                api_key.map(String::from),
                model,
                temperature,
                timeout,
            )?)),
            other => Err(LlmProviderError::Provider(format!(
                "Unknown provider: {other}. Supported: ollama, openai"
            ))),
        }
    }

    /// Builds the configured provider, wrapped with the Ollama fallback when enabled.
    pub fn from_config(config: &ScholarConfig) -> Result<Arc<dyn LlmProvider>, LlmProviderError> {
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            config.external_timeout(),
        )?;

        if !config.llm_fallback_enabled {
            return Ok(primary);
        }

        Ok(Arc::new(LlmProviderWithFallback::new(
            primary,
            true,
            config.llm_fallback_url.clone(),
            config.llm_fallback_model.clone(),
            config.llm_temperature,
            config.external_timeout(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let provider =
            LlmProviderFactory::create("ollama", "llama3.1:8b", None, None, 0.7, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_provider() {
        let provider = LlmProviderFactory::create(
            "openai",
            "gpt-4o-mini",
            Some("test-key"),
            Some("http://localhost:8000/v1"),
            0.3,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_provider_errors() {
        let result = LlmProviderFactory::create("unknown", "model", None, None, 0.5, Duration::from_secs(5));
        assert!(matches!(result, Err(LlmProviderError::Provider(_))));
    }

    #[test]
    fn test_from_config_wraps_fallback() {
        let config = ScholarConfig {
            llm_fallback_enabled: true,
            ..Default::default()
        };
        let provider = LlmProviderFactory::from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }
}
