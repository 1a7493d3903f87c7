

use thiserror::Error;

use crate::core::store::StoreError;
use crate::llm::providers::base::LlmProviderError;
use crate::toolkit::graph::GraphError;
use crate::toolkit::semantic::SemanticError;


#[derive(Error, Debug)]
pub enum ScholarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Datastore error: {0}")]
    Storage(#[from] StoreError),

    #[error("Keyword index error: {0}")]
    Index(String),

    #[error("Knowledge graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Semantic search error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out after {0}s: {1}")]
    Timeout(u64, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for ScholarError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, ScholarError>;
