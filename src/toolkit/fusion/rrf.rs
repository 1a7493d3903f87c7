

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::debug;

use super::models::FusedCandidate;
use crate::toolkit::keyword::KeywordHit;
use crate::toolkit::semantic::SemanticHit;

pub const RRF_K: f64 = 60.0;

/// Key used to match the same chunk across retrievers.
pub fn normalize_chunk_id(chunk_id: &str) -> String {
    chunk_id.trim().to_lowercase()
}

/// Reciprocal Rank Fusion of the keyword and semantic lists.
///
/// Each 1-based rank `r` contributes `1 / (k + r)`. Ties keep first-seen order,
/// keyword list first.
pub fn rrf_fuse(keyword: Vec<KeywordHit>, semantic: Vec<SemanticHit>, k: f64) -> Vec<FusedCandidate> {
    let mut order: HashMap<String, usize> = HashMap::new();
    let mut fused: Vec<FusedCandidate> = Vec::with_capacity(keyword.len() + semantic.len());

    for (rank, hit) in keyword.into_iter().enumerate() {
        let rank = rank + 1;
        let key = normalize_chunk_id(&hit.chunk.chunk_id);
        let contribution = 1.0 / (k + rank as f64);

        match order.get(&key) {
            Some(&idx) => fused[idx].fusion_score += contribution,
            None => {
                order.insert(key, fused.len());
                fused.push(FusedCandidate {
                    chunk: hit.chunk,
                    keyword_rank: Some(rank),
                    keyword_score: Some(hit.score),
                    keyword_relevance: Some(hit.relevance),
                    semantic_rank: None,
                    semantic_score: None,
                    fusion_score: contribution,
                    rerank_position: None,
                    related_papers: Vec::new(),
                });
            }
        }
    }

    for (rank, hit) in semantic.into_iter().enumerate() {
        let rank = rank + 1;
        let key = normalize_chunk_id(&hit.chunk_id);
        let contribution = 1.0 / (k + rank as f64);

        match order.get(&key) {
            Some(&idx) => {
                let candidate = &mut fused[idx];
                candidate.fusion_score += contribution;
                if candidate.semantic_rank.is_none() {
                    candidate.semantic_rank = Some(rank);
                    candidate.semantic_score = Some(hit.similarity);
                }
            }
            None => {
                order.insert(key, fused.len());
                let similarity = hit.similarity;
                fused.push(FusedCandidate {
                    chunk: hit.into_chunk(),
                    keyword_rank: None,
                    keyword_score: None,
                    keyword_relevance: None,
                    semantic_rank: Some(rank),
                    semantic_score: Some(similarity),
                    fusion_score: contribution,
                    rerank_position: None,
                    related_papers: Vec::new(),
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equal scores.
    fused.sort_by(|a, b| b.fusion_score.partial_cmp(&a.fusion_score).unwrap_or(Ordering::Equal));

    debug!(rrf_k = k, result_count = fused.len(), "RRF fusion complete");
    fused
}
