

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::toolkit::fusion::{FusedCandidate, RetrievalMethod};
use crate::toolkit::graph::RelatedPaper;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionInfo {
    pub keyword_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
    pub combined_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_position: Option<usize>,
}

/// One citable entry of an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source_number: usize,
    /// 1-based index of the paper in order of first appearance.
    pub paper_number: usize,
    pub paper_id: i64,
    pub title: String,
    pub external_id: String,
    pub section: String,
    pub relevance_score: f64,
    pub retrieval_method: RetrievalMethod,
    pub fusion_info: FusionInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_papers: Vec<RelatedPaper>,
}


pub fn format_sources(candidates: &[FusedCandidate]) -> Vec<SourceEntry> {
    let mut paper_numbers: HashMap<i64, usize> = HashMap::new();

    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let next = paper_numbers.len() + 1;
            let paper_number = *paper_numbers.entry(candidate.chunk.paper_id).or_insert(next);
            let chunk = &candidate.chunk;

            SourceEntry {
                source_number: i + 1,
                paper_number,
                paper_id: chunk.paper_id,
                title: if chunk.title.is_empty() { "Unknown".to_string() } else { chunk.title.clone() },
                external_id: if chunk.external_paper_id.is_empty() {
                    "Unknown".to_string()
                } else {
                    chunk.external_paper_id.clone()
                },
                section: if chunk.section_label.is_empty() {
                    "Unknown".to_string()
                } else {
                    chunk.section_label.clone()
                },
                relevance_score: candidate.relevance(),
                retrieval_method: candidate.method(),
                fusion_info: FusionInfo {
                    keyword_rank: candidate.keyword_rank,
                    semantic_rank: candidate.semantic_rank,
                    combined_score: candidate.fusion_score,
                    rerank_position: candidate.rerank_position,
                },
                related_papers: candidate.related_papers.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Chunk;

    fn candidate(id: &str, paper_id: i64, keyword: bool, semantic: bool) -> FusedCandidate {
        FusedCandidate {
            chunk: Chunk::new(id, paper_id, "results", "text").with_title("Title", "2101.00001"),
            keyword_rank: keyword.then_some(1),
            keyword_score: keyword.then_some(3.2),
            keyword_relevance: keyword.then_some(0.8),
            semantic_rank: semantic.then_some(2),
            semantic_score: semantic.then_some(0.7),
            fusion_score: 0.03,
            rerank_position: None,
            related_papers: Vec::new(),
        }
    }

    #[test]
    fn test_paper_numbers_follow_first_appearance() {
        let sources = format_sources(&[
            candidate("a", 7, true, false),
            candidate("b", 3, false, true),
            candidate("c", 7, true, true),
        ]);

        let numbers: Vec<(usize, usize)> = sources.iter().map(|s| (s.source_number, s.paper_number)).collect();
        assert_eq!(numbers, vec![(1, 1), (2, 2), (3, 1)]);
        assert_eq!(sources[0].retrieval_method, RetrievalMethod::Keyword);
        assert_eq!(sources[1].retrieval_method, RetrievalMethod::Semantic);
        assert_eq!(sources[1].relevance_score, 0.7);
        assert_eq!(sources[2].retrieval_method, RetrievalMethod::Hybrid);
        assert_eq!(sources[2].fusion_info.semantic_rank, Some(2));
    }
}
