

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::models::FusedCandidate;
use crate::llm::providers::base::{GenerationOptions, LlmProvider};
use crate::utils::safe_truncate;

const RERANK_SYSTEM_PROMPT: &str = "You rank search results by relevance to a research question.";
const RERANK_TEMPERATURE: f64 = 0.1;
const RERANK_MAX_TOKENS: u32 = 50;
const TITLE_CHARS: usize = 50;
const TEXT_CHARS: usize = 200;


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RerankOutcome {
    /// Too few candidates, or reranking disabled.
    #[default]
    Skipped,
    /// Number of candidates the model placed explicitly.
    Applied(usize),
    /// The reply held no usable position.
    Unparsed,
    Failed(String),
}


pub fn build_rerank_prompt(query: &str, candidates: &[FusedCandidate]) -> String {
    let mut comparison = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let title = if candidate.chunk.title.is_empty() {
            "Unknown".to_string()
        } else {
            safe_truncate(&candidate.chunk.title, TITLE_CHARS)
        };
        let section = if candidate.chunk.section_label.is_empty() {
            "Unknown"
        } else {
            candidate.chunk.section_label.as_str()
        };
        comparison.push_str(&format!(
            "\n[Result {}] {} ({})\n{}\n",
            i + 1,
            title,
            section,
            safe_truncate(&candidate.chunk.text, TEXT_CHARS)
        ));
    }

    format!(
        "Rerank these search results by relevance to the query. Return ONLY the ranking order.\n\n\
         QUERY: {query}\n\n\
         RESULTS:\n{comparison}\n\n\
         Respond with ONLY the result numbers in order of relevance (1-indexed), comma-separated.\n\
         Example: \"3,1,5,2,4\"\n\
         Most relevant first."
    )
}

/// Parses a comma-separated list of 1-based positions into distinct 0-based
/// indices below `len`. Anything else in the reply is ignored.
pub fn parse_ranking(reply: &str, len: usize) -> Vec<usize> {
    let mut seen = HashSet::new();
    reply
        .split(',')
        .map(|token| token.trim().trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|token| token.parse::<usize>().ok())
        .filter(|&position| position >= 1 && position <= len)
        .map(|position| position - 1)
        .filter(|index| seen.insert(*index))
        .collect()
}

/// Reorders the first `slice_len` candidates: ranked indices first, then the
/// unmentioned slice members in their original order, then the untouched tail.
pub fn apply_ranking(candidates: Vec<FusedCandidate>, slice_len: usize, ranking: &[usize]) -> Vec<FusedCandidate> {
    let slice_len = slice_len.min(candidates.len());
    let mut slots: Vec<Option<FusedCandidate>> = candidates.into_iter().map(Some).collect();
    let mut reordered = Vec::with_capacity(slots.len());

    for &index in ranking.iter().filter(|&&i| i < slice_len) {
        if let Some(mut candidate) = slots[index].take() {
            candidate.rerank_position = Some(reordered.len() + 1);
            reordered.push(candidate);
        }
    }
    reordered.extend(slots.into_iter().flatten());
    reordered
}

/// Asks the language model to reorder the head of the fused list.
pub struct LlmReranker {
    llm: Arc<dyn LlmProvider>,
    min_candidates: usize,
    max_candidates: usize,
    timeout: Duration,
}

impl LlmReranker {
    pub fn new(llm: Arc<dyn LlmProvider>, min_candidates: usize, max_candidates: usize, timeout: Duration) -> Self {
        Self {
            llm,
            min_candidates,
            max_candidates,
            timeout,
        }
    }

    /// Never fails: any problem leaves the fusion order in place.
    pub async fn rerank(&self, query: &str, candidates: Vec<FusedCandidate>) -> (Vec<FusedCandidate>, RerankOutcome) {
        if candidates.len() <= self.min_candidates {
            return (candidates, RerankOutcome::Skipped);
        }

        let slice_len = candidates.len().min(self.max_candidates);
        let prompt = build_rerank_prompt(query, &candidates[..slice_len]);
        let options = GenerationOptions::new(RERANK_TEMPERATURE, RERANK_MAX_TOKENS);

        let reply = match tokio::time::timeout(
            self.timeout,
            self.llm.generate(RERANK_SYSTEM_PROMPT, &prompt, &options),
        )
        .await
        {
            Ok(Ok((reply, _))) => reply,
            Ok(Err(e)) => {
                warn!("Rerank failed: {}, using RRF order", e);
                return (candidates, RerankOutcome::Failed(e.to_string()));
            }
            Err(_) => {
                warn!("Rerank timed out after {:?}, using RRF order", self.timeout);
                return (candidates, RerankOutcome::Failed("timed out".to_string()));
            }
        };

        let ranking = parse_ranking(reply.trim(), slice_len);
        if ranking.is_empty() {
            debug!("Rerank reply had no usable positions: {:?}", reply);
            return (candidates, RerankOutcome::Unparsed);
        }

        info!("Rerank applied to {} results ({} placed)", slice_len, ranking.len());
        let placed = ranking.len();
        (apply_ranking(candidates, slice_len, &ranking), RerankOutcome::Applied(placed))
    }
}
