

use std::sync::Arc;

use tracing::{debug, warn};

use crate::toolkit::fusion::FusedCandidate;
use crate::toolkit::graph::KnowledgeGraph;

/// Attaches graph neighbours to retrieved chunks.
pub struct GraphEnricher {
    graph: Arc<KnowledgeGraph>,
    per_result: usize,
}

impl GraphEnricher {
    pub fn new(graph: Arc<KnowledgeGraph>, per_result: usize) -> Self {
        Self { graph, per_result }
    }

    /// Chunks whose paper is missing from the graph are skipped with a warning.
    /// Returns how many were skipped.
    pub fn enrich(&self, candidates: &mut [FusedCandidate], job_id: Option<i64>) -> usize {
        let mut skipped = 0;
        for candidate in candidates.iter_mut() {
            let paper_id = candidate.chunk.paper_id;
            if self.graph.paper(paper_id).is_none() {
                warn!("Paper {} is not in the knowledge graph, skipping enrichment", paper_id);
                skipped += 1;
                continue;
            }
            candidate.related_papers = self.graph.find_related_papers(paper_id, self.per_result, job_id);
        }
        let attached: usize = candidates.iter().map(|c| c.related_papers.len()).sum();
        debug!("Enriched {} results with {} related papers", candidates.len(), attached);
        skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Chunk, PaperFields};

    fn candidate(paper_id: i64) -> FusedCandidate {
        FusedCandidate {
            chunk: Chunk::new(format!("c{paper_id}"), paper_id, "intro", "text"),
            keyword_rank: Some(1),
            keyword_score: Some(1.0),
            keyword_relevance: Some(1.0),
            semantic_rank: None,
            semantic_score: None,
            fusion_score: 0.0,
            rerank_position: None,
            related_papers: Vec::new(),
        }
    }

    #[test]
    fn test_enrich_attaches_bounded_related_papers() {
        let graph = Arc::new(KnowledgeGraph::default());
        for id in 1..=5 {
            let mut fields = PaperFields::new("", format!("Paper {id}"));
            fields.authors = vec!["Shared Author".to_string()];
            graph.add_paper(id, &fields, 1);
        }

        let enricher = GraphEnricher::new(graph, 3);
        let mut candidates = vec![candidate(1), candidate(99)];
        let skipped = enricher.enrich(&mut candidates, Some(1));

        assert_eq!(skipped, 1);
        assert_eq!(candidates[0].related_papers.len(), 3);
        assert!(candidates[1].related_papers.is_empty());
    }

    #[test]
    fn test_missing_papers_are_skipped_and_counted() {
        let graph = Arc::new(KnowledgeGraph::default());
        let mut fields = PaperFields::new("", "Known Paper");
        fields.authors = vec!["Shared Author".to_string()];
        graph.add_paper(1, &fields, 1);
        let mut sibling = PaperFields::new("", "Sibling Paper");
        sibling.authors = vec!["Shared Author".to_string()];
        graph.add_paper(2, &sibling, 1);

        let enricher = GraphEnricher::new(graph, 5);
        let mut candidates = vec![candidate(7), candidate(8), candidate(1)];
        let skipped = enricher.enrich(&mut candidates, None);

        assert_eq!(skipped, 2);
        assert!(candidates[0].related_papers.is_empty());
        assert!(candidates[1].related_papers.is_empty());
        assert_eq!(candidates[2].related_papers.len(), 1);
        assert_eq!(candidates[2].related_papers[0].paper_id, 2);
    }
}
