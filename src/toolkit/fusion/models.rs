

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use super::rerank::RerankOutcome;
use crate::core::models::Chunk;
use crate::toolkit::graph::RelatedPaper;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RetrievalMethod {
    Keyword,
    Semantic,
    Hybrid,
}

/// One chunk after rank fusion, carrying the evidence from each retriever.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub chunk: Chunk,
    pub keyword_rank: Option<usize>,
    pub keyword_score: Option<f64>,
    pub keyword_relevance: Option<f64>,
    pub semantic_rank: Option<usize>,
    pub semantic_score: Option<f64>,
    pub fusion_score: f64,
    pub rerank_position: Option<usize>,
    pub related_papers: Vec<RelatedPaper>,
}

impl FusedCandidate {
    /// Normalized keyword relevance when the keyword side found the chunk,
    /// otherwise the semantic similarity.
    pub fn relevance(&self) -> f64 {
        self.keyword_relevance
            .or(self.semantic_score)
            .unwrap_or(0.0)
    }

    pub fn method(&self) -> RetrievalMethod {
        match (self.keyword_rank, self.semantic_rank) {
            (Some(_), Some(_)) => RetrievalMethod::Hybrid,
            (None, Some(_)) => RetrievalMethod::Semantic,
            _ => RetrievalMethod::Keyword,
        }
    }
}

/// Per-query counts describing how the result list was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalDiagnostics {
    pub keyword_count: usize,
    pub semantic_count: usize,
    pub fused_count: usize,
    pub deduplicated_count: usize,
    pub final_count: usize,
    /// Both retrievers came back empty and were refreshed before a retry.
    pub refreshed: bool,
    pub rerank: RerankOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(keyword: Option<f64>, semantic: Option<f64>) -> FusedCandidate {
        FusedCandidate {
            chunk: Chunk::new("c", 1, "intro", "text"),
            keyword_rank: keyword.map(|_| 1),
            keyword_score: keyword,
            keyword_relevance: keyword,
            semantic_rank: semantic.map(|_| 1),
            semantic_score: semantic,
            fusion_score: 0.0,
            rerank_position: None,
            related_papers: Vec::new(),
        }
    }

    #[test]
    fn test_relevance_prefers_keyword_side() {
        assert_eq!(candidate(Some(0.4), Some(0.9)).relevance(), 0.4);
        assert_eq!(candidate(None, Some(0.9)).relevance(), 0.9);
    }

    #[test]
    fn test_method_labels() {
        assert_eq!(candidate(Some(1.0), Some(0.5)).method(), RetrievalMethod::Hybrid);
        assert_eq!(candidate(None, Some(0.5)).method(), RetrievalMethod::Semantic);
        assert_eq!(candidate(Some(1.0), None).method(), RetrievalMethod::Keyword);
    }
}
