

pub mod base;
pub mod fallback;
pub mod ollama;
pub mod openai;

pub use base::{GenerationOptions, LlmMetadata, LlmProvider, LlmProviderError};
pub use fallback::LlmProviderWithFallback;
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatibleProvider;
