

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::dedup::deduplicate;
use super::models::{FusedCandidate, RetrievalDiagnostics};
use super::preprocess::preprocess_query;
use super::rerank::{LlmReranker, RerankOutcome};
use super::rrf::rrf_fuse;
use crate::core::models::SearchFilter;
use crate::toolkit::keyword::{KeywordHit, KeywordIndex};
use crate::toolkit::semantic::{SemanticError, SemanticHit, SemanticSearch};


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionSettings {
    pub top_k: usize,
    pub rrf_k: f64,
    pub result_count: usize,
    pub timeout: Duration,
}


#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub candidates: Vec<FusedCandidate>,
    pub diagnostics: RetrievalDiagnostics,
}

/// Runs both retrievers, fuses their rankings and trims the result list.
pub struct FusionEngine {
    keyword: Arc<KeywordIndex>,
    semantic: Arc<dyn SemanticSearch>,
    reranker: Option<LlmReranker>,
    settings: FusionSettings,
}

impl FusionEngine {
    pub fn new(
        keyword: Arc<KeywordIndex>,
        semantic: Arc<dyn SemanticSearch>,
        reranker: Option<LlmReranker>,
        settings: FusionSettings,
    ) -> Self {
        Self {
            keyword,
            semantic,
            reranker,
            settings,
        }
    }

    /// Keyword side gets the preprocessed query, semantic side the raw question.
    pub async fn retrieve(&self, question: &str, filter: &SearchFilter) -> RetrievalOutcome {
        let keyword_query = preprocess_query(question);
        debug!("Processed query: {}", keyword_query);

        let mut diagnostics = RetrievalDiagnostics::default();
        let (mut keyword_hits, mut semantic) = self.retrieve_once(question, &keyword_query, filter).await;

        if keyword_hits.is_empty() && semantic.as_ref().map_or(true, Vec::is_empty) {
            info!("Both retrievers empty, refreshing indexes and retrying once");
            self.refresh_backends().await;
            diagnostics.refreshed = true;
            (keyword_hits, semantic) = self.retrieve_once(question, &keyword_query, filter).await;
        }

        let semantic_hits = match semantic {
            Ok(hits) => hits,
            Err(e) => {
                diagnostics.semantic_error = Some(e);
                Vec::new()
            }
        };

        diagnostics.keyword_count = keyword_hits.len();
        diagnostics.semantic_count = semantic_hits.len();
        info!(
            "Keyword results: {}, Semantic results: {}",
            diagnostics.keyword_count, diagnostics.semantic_count
        );

        let fused = rrf_fuse(keyword_hits, semantic_hits, self.settings.rrf_k);
        diagnostics.fused_count = fused.len();

        let (reranked, outcome) = match &self.reranker {
            Some(reranker) => reranker.rerank(question, fused).await,
            None => (fused, RerankOutcome::Skipped),
        };
        diagnostics.rerank = outcome;

        let mut unique = deduplicate(reranked);
        diagnostics.deduplicated_count = unique.len();
        unique.truncate(self.settings.result_count);
        diagnostics.final_count = unique.len();

        info!("Final results: {} unique documents", diagnostics.final_count);
        RetrievalOutcome {
            candidates: unique,
            diagnostics,
        }
    }

    async fn retrieve_once(
        &self,
        question: &str,
        keyword_query: &str,
        filter: &SearchFilter,
    ) -> (Vec<KeywordHit>, Result<Vec<SemanticHit>, String>) {
        let top_k = self.settings.top_k;

        let keyword_task = {
            let index = Arc::clone(&self.keyword);
            let query = keyword_query.to_string();
            let filter = *filter;
            tokio::task::spawn_blocking(move || index.search(&query, top_k, &filter))
        };
        let semantic_call = tokio::time::timeout(self.settings.timeout, self.semantic.search(question, top_k, filter));

        let (keyword_result, semantic_result) = tokio::join!(keyword_task, semantic_call);

        let keyword_hits = keyword_result.unwrap_or_else(|e| {
            warn!("Keyword retrieval failed: {}", e);
            Vec::new()
        });

        let semantic_hits = match semantic_result {
            Ok(Ok(hits)) => Ok(hits),
            Ok(Err(SemanticError::Disabled)) => Err(SemanticError::Disabled.to_string()),
            Ok(Err(e)) => {
                warn!("Semantic retrieval failed: {}", e);
                Err(e.to_string())
            }
            Err(_) => {
                warn!("Semantic retrieval timed out after {:?}", self.settings.timeout);
                Err(format!("timed out after {:?}", self.settings.timeout))
            }
        };

        (keyword_hits, semantic_hits)
    }

    async fn refresh_backends(&self) {
        if let Err(e) = self.keyword.refresh().await {
            warn!("Keyword index refresh failed: {}", e);
        }
        match tokio::time::timeout(self.settings.timeout, self.semantic.refresh()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Semantic index refresh failed: {}", e),
            Err(_) => warn!("Semantic index refresh timed out"),
        }
    }
}
