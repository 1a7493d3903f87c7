

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::toolkit::fusion::FusedCandidate;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Error,
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceAssessment {
    pub confidence: Confidence,
    pub papers: usize,
    pub average_relevance: f64,
}

/// `high`: at least 3 papers with mean relevance >= 0.5;
/// `medium`: at least 1 paper with mean relevance >= 0.3; otherwise `low`.
pub fn classify(papers: usize, average_relevance: f64) -> Confidence {
    if papers >= 3 && average_relevance >= 0.5 {
        Confidence::High
    } else if papers >= 1 && average_relevance >= 0.3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}


pub fn assess(candidates: &[FusedCandidate]) -> ConfidenceAssessment {
    let papers = candidates
        .iter()
        .map(|c| c.chunk.paper_id)
        .collect::<HashSet<_>>()
        .len();
    let average_relevance = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(FusedCandidate::relevance).sum::<f64>() / candidates.len() as f64
    };
    ConfidenceAssessment {
        confidence: classify(papers, average_relevance),
        papers,
        average_relevance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Chunk;

    fn candidate(paper_id: i64, relevance: f64) -> FusedCandidate {
        FusedCandidate {
            chunk: Chunk::new(format!("c{paper_id}"), paper_id, "intro", "text"),
            keyword_rank: Some(1),
            keyword_score: Some(relevance),
            keyword_relevance: Some(relevance),
            semantic_rank: None,
            semantic_score: None,
            fusion_score: 0.0,
            rerank_position: None,
            related_papers: Vec::new(),
        }
    }

    #[test]
    fn test_three_papers_high_relevance_is_high() {
        let assessment = assess(&[candidate(1, 0.6), candidate(2, 0.6), candidate(3, 0.6)]);
        assert_eq!(assessment.confidence, Confidence::High);
        assert_eq!(assessment.papers, 3);
    }

    #[test]
    fn test_single_paper_low_relevance_is_low() {
        let assessment = assess(&[candidate(1, 0.2)]);
        assert_eq!(assessment.confidence, Confidence::Low);
    }

    #[test]
    fn test_medium_band() {
        assert_eq!(classify(1, 0.3), Confidence::Medium);
        assert_eq!(classify(5, 0.45), Confidence::Medium);
        assert_eq!(classify(0, 0.9), Confidence::Low);
    }

    #[test]
    fn test_labels() {
        let label: &'static str = Confidence::Error.into();
        assert_eq!(label, "error");
        assert_eq!(serde_json::to_value(Confidence::High).unwrap(), "high");
    }
}
