

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::ScholarConfig;
use super::error::Result;
use super::models::{Chunk, PaperFields, Reference, UNSCOPED_JOB_ID};
use super::store::{ChunkStore, MemoryChunkStore};
use crate::llm::factory::LlmProviderFactory;
use crate::llm::providers::base::LlmProvider;
use crate::toolkit::answer::{
    AnswerOrchestrator, AnswerSettings, CacheStats, ContextLimits, QueryCache, QueryResponse, ResearchSummary,
};
use crate::toolkit::enrich::GraphEnricher;
use crate::toolkit::fusion::{FusionEngine, FusionSettings, LlmReranker};
use crate::toolkit::graph::{
    save_or_warn, GraphOptions, GraphStats, KnowledgeGraph, RelatedPaper, ResearchOverview,
};
use crate::toolkit::ingest::{PaperChunker, PaperSection};
use crate::toolkit::keyword::{IndexStats, KeywordIndex};
use crate::toolkit::semantic::{DisabledSemanticSearch, HttpSemanticSearch, SemanticSearch};


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphUpdate {
    pub citation_links_created: usize,
    pub authors: usize,
    pub concepts: usize,
    pub persisted: bool,
}


#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub index: IndexStats,
    pub graph: GraphStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// Entry point tying the datastore, both retrievers, the knowledge graph and
/// the answer pipeline together.
pub struct ResearchEngine {
    config: ScholarConfig,
    store: Arc<dyn ChunkStore>,
    keyword: Arc<KeywordIndex>,
    semantic: Arc<dyn SemanticSearch>,
    graph: Arc<KnowledgeGraph>,
    orchestrator: AnswerOrchestrator,
    chunker: PaperChunker,
    /// Held across the store, semantic, keyword and cache steps of a re-index.
    index_lock: Mutex<()>,
}

impl ResearchEngine {
    pub fn new(
        config: ScholarConfig,
        store: Arc<dyn ChunkStore>,
        semantic: Arc<dyn SemanticSearch>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let graph_options = GraphOptions {
            extract_concepts: config.extract_concepts,
            max_concepts_per_paper: config.max_concepts_per_paper,
            citation_similarity_threshold: config.citation_similarity_threshold,
        };
        let graph = match &config.graph_path {
            Some(path) => KnowledgeGraph::open(path, graph_options)?,
            None => KnowledgeGraph::new(graph_options),
        };
        let graph = Arc::new(graph);

        let keyword = Arc::new(KeywordIndex::new(Arc::clone(&store)));
        let timeout = config.external_timeout();

        let reranker = config.rerank_enabled.then(|| {
            LlmReranker::new(
                Arc::clone(&llm),
                config.rerank_min_candidates,
                config.rerank_max_candidates,
                timeout,
            )
        });
        let fusion = FusionEngine::new(
            Arc::clone(&keyword),
            Arc::clone(&semantic),
            reranker,
            FusionSettings {
                top_k: config.retrieval_top_k,
                rrf_k: config.rrf_k,
                result_count: config.result_count,
                timeout,
            },
        );

        let enricher = GraphEnricher::new(Arc::clone(&graph), config.related_per_result);
        let cache = config
            .cache_enabled
            .then(|| QueryCache::new(config.cache_size, config.cache_ttl_secs));
        let settings = AnswerSettings {
            temperature: config.llm_temperature,
            max_tokens: config.answer_max_tokens,
            context: ContextLimits {
                max_words: config.max_context_words,
                max_papers: config.max_context_papers,
                chunks_per_paper: config.chunks_per_paper_in_context,
            },
            timeout,
        };
        let orchestrator = AnswerOrchestrator::new(fusion, enricher, llm, cache, settings);
        let chunker = PaperChunker::from_config(&config)?;

        info!(
            "Research engine created: semantic={}, rerank={}, cache={}",
            semantic.backend_name(),
            config.rerank_enabled,
            config.cache_enabled
        );

        Ok(Self {
            config,
            store,
            keyword,
            semantic,
            graph,
            orchestrator,
            chunker,
            index_lock: Mutex::new(()),
        })
    }

    /// Builds the default stack: JSON chunk store, HTTP semantic adapter when
    /// an endpoint is configured, and the configured LLM provider.
    pub fn from_config(config: ScholarConfig) -> Result<Self> {
        let store: Arc<dyn ChunkStore> = match &config.chunks_path {
            Some(path) => Arc::new(MemoryChunkStore::open(path)?),
            None => Arc::new(MemoryChunkStore::new()),
        };
        let semantic: Arc<dyn SemanticSearch> = match &config.semantic_url {
            Some(url) => Arc::new(HttpSemanticSearch::new(url, config.external_timeout())?),
            None => {
                warn!("No semantic endpoint configured, running keyword-only");
                Arc::new(DisabledSemanticSearch)
            }
        };
        let llm = LlmProviderFactory::from_config(&config)?;
        Self::new(config, store, semantic, llm)
    }

    /// Loads the keyword index from the datastore.
    pub async fn initialize(&self) -> Result<IndexStats> {
        self.keyword.refresh().await
    }


    pub async fn refresh(&self) -> Result<IndexStats> {
        let stats = self.keyword.refresh().await?;
        if let Err(e) = self.semantic.refresh().await {
            warn!("Semantic refresh failed: {}", e);
        }
        self.orchestrator.clear_cache();
        Ok(stats)
    }


    pub fn config(&self) -> &ScholarConfig {
        &self.config
    }


    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }


    pub async fn query(&self, question: &str, job_id: Option<i64>, paper_id: Option<i64>) -> QueryResponse {
        self.orchestrator.query(question, job_id, paper_id).await
    }

    /// Replaces every chunk of a paper in the datastore and both indexes.
    ///
    /// Unscoped chunks inherit the paper's job from the datastore. Semantic
    /// indexing failures are logged; the keyword side is still refreshed.
    /// Re-indexes run one at a time, so the last call's chunk set is the one
    /// left in every index.
    pub async fn index_paper(&self, paper_id: i64, chunks: Vec<Chunk>) -> Result<usize> {
        let _guard = self.index_lock.lock().await;

        let paper_job = self.store.fetch_paper_job(paper_id).await?;
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .map(|chunk| match paper_job {
                Some(job_id) if chunk.is_unscoped() => chunk.with_job(job_id),
                _ => chunk,
            })
            .collect();

        let stored = match self.store.replace_paper_chunks(paper_id, chunks).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Storing chunks for paper {} failed: {}", paper_id, e);
                self.resync_keyword().await;
                return Err(e.into());
            }
        };
        let indexed: Vec<Chunk> = self
            .store
            .fetch_all_chunks()
            .await?
            .into_iter()
            .filter(|chunk| chunk.paper_id == paper_id)
            .collect();

        if let Err(e) = self.semantic.delete_paper(paper_id).await {
            warn!("Semantic delete failed for paper {}: {}", paper_id, e);
        }
        if !indexed.is_empty() {
            match self.semantic.index_chunks(paper_id, &indexed).await {
                Ok(count) => debug!("Semantic index accepted {} chunks for paper {}", count, paper_id),
                Err(e) => warn!("Semantic indexing failed for paper {}: {}", paper_id, e),
            }
        }

        self.keyword.refresh().await?;
        self.orchestrator.clear_cache();

        info!("Indexed paper {}: {} chunks", paper_id, stored);
        Ok(stored)
    }

    /// A failed store write may still have changed the in-memory chunks.
    async fn resync_keyword(&self) {
        if let Err(e) = self.keyword.refresh().await {
            warn!("Keyword refresh after failed write failed: {}", e);
        }
        self.orchestrator.clear_cache();
    }

    /// Chunks a paper's abstract, contributions and sections, then indexes them.
    pub async fn index_paper_sections(
        &self,
        paper_id: i64,
        fields: &PaperFields,
        sections: &[PaperSection],
        job_id: Option<i64>,
    ) -> Result<usize> {
        let job_id = self.resolve_job(paper_id, job_id).await?;
        let chunks = self.chunker.chunk_paper(paper_id, job_id, fields, sections);
        self.index_paper(paper_id, chunks).await
    }

    /// Adds a paper with its authors, concepts and citation links to the graph.
    ///
    /// Without an explicit job the paper's job is looked up in the datastore.
    pub async fn add_to_graph(
        &self,
        paper_id: i64,
        fields: &PaperFields,
        references: &[Reference],
        job_id: Option<i64>,
    ) -> Result<GraphUpdate> {
        let job_id = self.resolve_job(paper_id, job_id).await?;

        let summary = self.graph.add_paper(paper_id, fields, job_id);
        let citation_links_created = self.graph.link_citations(paper_id, references);
        let persisted = self.graph.path().is_some() && self.save_graph_blocking().await;
        self.orchestrator.clear_cache();

        info!(
            "Added paper {} to graph: {} authors, {} concepts, {} citation links",
            paper_id, summary.authors, summary.concepts, citation_links_created
        );

        Ok(GraphUpdate {
            citation_links_created,
            authors: summary.authors,
            concepts: summary.concepts,
            persisted,
        })
    }


    async fn resolve_job(&self, paper_id: i64, job_id: Option<i64>) -> Result<i64> {
        match job_id {
            Some(job_id) => Ok(job_id),
            None => Ok(self
                .store
                .fetch_paper_job(paper_id)
                .await?
                .unwrap_or(UNSCOPED_JOB_ID)),
        }
    }


    pub fn related_papers(&self, paper_id: i64, max_results: usize, job_id: Option<i64>) -> Vec<RelatedPaper> {
        self.graph.find_related_papers(paper_id, max_results, job_id)
    }


    pub fn research_overview(&self, job_id: Option<i64>) -> ResearchOverview {
        self.graph.research_overview(job_id)
    }


    /// LLM-written landscape of the graph, optionally for one job.
    pub async fn research_summary(&self, job_id: Option<i64>) -> ResearchSummary {
        let overview = self.graph.research_overview(job_id);
        self.orchestrator.research_summary(overview).await
    }


    pub fn statistics(&self) -> EngineStats {
        EngineStats {
            index: self.keyword.stats(),
            graph: self.graph.statistics(),
            cache: self.orchestrator.cache_stats(),
        }
    }


    async fn save_graph_blocking(&self) -> bool {
        let graph = Arc::clone(&self.graph);
        match tokio::task::spawn_blocking(move || save_or_warn(&graph)).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Graph save task failed: {}", e);
                false
            }
        }
    }
}
