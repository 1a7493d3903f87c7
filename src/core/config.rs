

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::Result;
use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL};


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScholarConfig {

    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,
    pub answer_max_tokens: u32,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub semantic_url: Option<String>,
    pub external_timeout_secs: u64,


    pub retrieval_top_k: usize,
    pub rrf_k: f64,
    pub rerank_enabled: bool,
    pub rerank_min_candidates: usize,
    pub rerank_max_candidates: usize,
    pub result_count: usize,


    pub max_context_words: usize,
    pub max_context_papers: usize,
    pub chunks_per_paper_in_context: usize,
    pub related_per_result: usize,


    pub extract_concepts: bool,
    pub max_concepts_per_paper: usize,
    pub citation_similarity_threshold: f64,
    pub graph_path: Option<PathBuf>,


    pub chunks_path: Option<PathBuf>,
    pub chunk_words: usize,
    pub chunk_overlap_words: usize,
    pub min_chunk_words: usize,


    pub cache_enabled: bool,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            llm_provider: "ollama".to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.3,
            answer_max_tokens: 800,

            llm_fallback_enabled: false,
            llm_fallback_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: DEFAULT_LLM_MODEL.to_string(),

            semantic_url: None,
            external_timeout_secs: 120,

            retrieval_top_k: crate::DEFAULT_RETRIEVAL_TOP_K,
            rrf_k: 60.0,
            rerank_enabled: true,
            rerank_min_candidates: 5,
            rerank_max_candidates: 15,
            result_count: 5,

            max_context_words: 3000,
            max_context_papers: 10,
            chunks_per_paper_in_context: 3,
            related_per_result: 3,

            extract_concepts: true,
            max_concepts_per_paper: 10,
            citation_similarity_threshold: 0.8,
            graph_path: Some(PathBuf::from("data/knowledge_graph.json")),

            chunks_path: None,
            chunk_words: 500,
            chunk_overlap_words: 50,
            min_chunk_words: 50,

            cache_enabled: true,
            cache_size: DEFAULT_CACHE_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL,
        }
    }
}

impl ScholarConfig {
    /// Layers defaults, an optional config file and `SCHOLAR_*` environment
    /// variables, later sources overriding earlier ones.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SCHOLAR")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn from_env() -> Self {
        let path = std::env::var("SCHOLAR_CONFIG").ok().map(PathBuf::from);
        match Self::load(path.as_deref()) {
            Ok(config) => {
                info!(
                    "Configuration loaded (llm={}/{}, semantic={})",
                    config.llm_provider,
                    config.llm_model,
                    config.semantic_url.as_deref().unwrap_or("disabled")
                );
                config
            }
            Err(e) => {
                warn!("Falling back to default configuration: {}", e);
                Self::default()
            }
        }
    }


    pub fn validate(&self) -> Result<()> {
        use super::error::ScholarError;

        if self.retrieval_top_k == 0 {
            return Err(ScholarError::Config("retrieval_top_k must be positive".into()));
        }
        if self.result_count == 0 {
            return Err(ScholarError::Config("result_count must be positive".into()));
        }
        if self.rrf_k <= 0.0 {
            return Err(ScholarError::Config("rrf_k must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.citation_similarity_threshold) {
            return Err(ScholarError::Config(
                "citation_similarity_threshold must be within [0, 1]".into(),
            ));
        }
        if self.chunk_overlap_words >= self.chunk_words {
            return Err(ScholarError::Config(
                "chunk_overlap_words must be smaller than chunk_words".into(),
            ));
        }
        if self.rerank_max_candidates < self.rerank_min_candidates {
            return Err(ScholarError::Config(
                "rerank_max_candidates must not be below rerank_min_candidates".into(),
            ));
        }
        Ok(())
    }


    pub fn external_timeout(&self) -> Duration {
        Duration::from_secs(self.external_timeout_secs.max(1))
    }
}
