use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::base::{GenerationOptions, LlmMetadata, LlmProvider, LlmProviderError};
use super::ollama::OllamaProvider;

/// Retries failed generations on a local Ollama model.
///
/// Answers produced by the fallback carry `fallback_used` and the primary's
/// name and error in their metadata; `QueryResponse::generated_by` exposes it.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback_enabled: bool,
    fallback_url: String,
    fallback_model: String,
    temperature: f64,
    timeout: Duration,
    fallback: OnceCell<Arc<dyn LlmProvider>>,
    consecutive_failures: AtomicUsize,
}

impl LlmProviderWithFallback {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback_enabled: bool,
        fallback_url: impl Into<String>,
        fallback_model: impl Into<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Self {
        let fallback_url = fallback_url.into();
        let fallback_model = fallback_model.into();
        info!(
            "LLM provider {} with fallback {}/{} (enabled={})",
            primary.provider_name(),
            fallback_url,
            fallback_model,
            fallback_enabled
        );

        Self {
            primary,
            fallback_enabled,
            fallback_url,
            fallback_model,
            temperature,
            timeout,
            fallback: OnceCell::new(),
            consecutive_failures: AtomicUsize::new(0),
        }
    }

    async fn fallback(&self) -> Result<&Arc<dyn LlmProvider>, LlmProviderError> {
        self.fallback
            .get_or_try_init(|| async {
                let provider = OllamaProvider::new(
                    self.fallback_url.clone(),
                    self.fallback_model.clone(),
                    self.temperature,
                    self.timeout,
                )?;
                Ok::<_, LlmProviderError>(Arc::new(provider) as Arc<dyn LlmProvider>)
            })
            .await
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let primary_error = match self.primary.generate(system_prompt, user_prompt, options).await {
            Ok(result) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                return Ok(result);
            }
            Err(e) => e,
        };

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            "{} failed ({} in a row): {}",
            self.primary.provider_name(),
            failures,
            primary_error
        );
        if !self.fallback_enabled {
            return Err(primary_error);
        }

        let (content, mut metadata) = self
            .fallback()
            .await?
            .generate(system_prompt, user_prompt, options)
            .await?;
        metadata.fallback_used = true;
        metadata.original_provider = Some(self.primary.provider_name().to_string());
        metadata.original_error = Some(primary_error.to_string());
        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        self.primary.provider_name()
    }

    fn model_name(&self) -> &str {
        self.primary.model_name()
    }
}
