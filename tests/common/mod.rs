#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use scholar_rag::llm::{GenerationOptions, LlmMetadata, LlmProvider, LlmProviderError};
use scholar_rag::core::StoreError;
use scholar_rag::toolkit::semantic::{SemanticError, SemanticHit, SemanticSearch};
use scholar_rag::{Chunk, ChunkStore, MemoryChunkStore, ResearchEngine, ScholarConfig, SearchFilter};


pub struct MockLlm {
    reply: Option<String>,
    via_fallback: bool,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn build(reply: Option<&str>, via_fallback: bool) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string),
            via_fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(reply: &str) -> Arc<Self> {
        Self::build(Some(reply), false)
    }

    /// Answers as a fallback model would after the primary failed.
    pub fn answering_via_fallback(reply: &str) -> Arc<Self> {
        Self::build(Some(reply), true)
    }

    pub fn failing() -> Arc<Self> {
        Self::build(None, false)
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(user_prompt.to_string());
        let metadata = LlmMetadata {
            provider: if self.via_fallback { "ollama" } else { "mock" }.to_string(),
            model: "mock-model".to_string(),
            fallback_used: self.via_fallback,
            original_provider: self.via_fallback.then(|| "openai".to_string()),
            original_error: self.via_fallback.then(|| "rate limited".to_string()),
            ..LlmMetadata::default()
        };
        match &self.reply {
            Some(reply) => Ok((reply.clone(), metadata)),
            None => Err(LlmProviderError::Provider("model offline".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Returns fixed hits filtered like a real backend, or fails every search.
///
/// `live` tracks which chunk ids each paper currently has in the index. Writes
/// yield first so interleaved callers actually interleave.
pub struct MockSemantic {
    hits: Vec<SemanticHit>,
    fail: bool,
    pub indexed: Mutex<Vec<(i64, usize)>>,
    pub live: Mutex<HashMap<i64, Vec<String>>>,
}

impl MockSemantic {
    pub fn with_hits(hits: Vec<SemanticHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail: false,
            indexed: Mutex::new(Vec::new()),
            live: Mutex::new(HashMap::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            fail: true,
            indexed: Mutex::new(Vec::new()),
            live: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl SemanticSearch for MockSemantic {
    async fn search(
        &self,
        _query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SemanticHit>, SemanticError> {
        if self.fail {
            return Err(SemanticError::Backend("vector service down".to_string()));
        }
        Ok(self
            .hits
            .iter()
            .filter(|hit| filter.admits(&(*hit).clone().into_chunk()))
            .take(top_k)
            .cloned()
            .collect())
    }

    async fn index_chunks(&self, paper_id: i64, chunks: &[Chunk]) -> Result<usize, SemanticError> {
        if self.fail {
            return Err(SemanticError::Backend("vector service down".to_string()));
        }
        tokio::task::yield_now().await;
        self.indexed.lock().push((paper_id, chunks.len()));
        self.live
            .lock()
            .entry(paper_id)
            .or_default()
            .extend(chunks.iter().map(|chunk| chunk.chunk_id.clone()));
        Ok(chunks.len())
    }

    async fn delete_paper(&self, paper_id: i64) -> Result<(), SemanticError> {
        tokio::task::yield_now().await;
        self.live.lock().remove(&paper_id);
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}


/// Applies every write in memory, then reports the file write as failed.
pub struct UnpersistedStore {
    pub inner: MemoryChunkStore,
}

#[async_trait]
impl ChunkStore for UnpersistedStore {
    async fn fetch_all_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        self.inner.fetch_all_chunks().await
    }

    async fn fetch_paper_job(&self, paper_id: i64) -> Result<Option<i64>, StoreError> {
        self.inner.fetch_paper_job(paper_id).await
    }

    async fn replace_paper_chunks(&self, paper_id: i64, chunks: Vec<Chunk>) -> Result<usize, StoreError> {
        self.inner.replace_paper_chunks(paper_id, chunks).await?;
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}


pub fn semantic_hit(chunk_id: &str, paper_id: i64, title: &str, text: &str, similarity: f64) -> SemanticHit {
    SemanticHit {
        chunk_id: chunk_id.to_string(),
        paper_id,
        job_id: 0,
        title: title.to_string(),
        external_id: format!("2401.{paper_id:05}"),
        section: "abstract".to_string(),
        text: text.to_string(),
        similarity,
    }
}


pub fn paper_chunk(paper_id: i64, title: &str, text: &str) -> Chunk {
    Chunk::new(format!("paper_{paper_id}_abstract"), paper_id, "abstract", text)
        .with_title(title, format!("2401.{paper_id:05}"))
}

/// In-memory configuration with rerank off so the mock LLM only answers.
pub fn test_config() -> ScholarConfig {
    ScholarConfig {
        graph_path: None,
        chunks_path: None,
        rerank_enabled: false,
        external_timeout_secs: 5,
        ..ScholarConfig::default()
    }
}


pub fn engine_with(
    config: ScholarConfig,
    semantic: Arc<dyn SemanticSearch>,
    llm: Arc<dyn LlmProvider>,
) -> (ResearchEngine, Arc<MemoryChunkStore>) {
    let store = Arc::new(MemoryChunkStore::new());
    let engine = ResearchEngine::new(config, store.clone(), semantic, llm).expect("engine");
    (engine, store)
}
