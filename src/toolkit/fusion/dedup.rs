

use std::collections::HashSet;

use tracing::debug;

use super::models::FusedCandidate;

/// Keeps the first candidate per `(paper_id, section_label)`.
pub fn deduplicate(candidates: Vec<FusedCandidate>) -> Vec<FusedCandidate> {
    let before = candidates.len();
    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let unique: Vec<FusedCandidate> = candidates
        .into_iter()
        .filter(|c| seen.insert((c.chunk.paper_id, c.chunk.section_label.clone())))
        .collect();
    debug!("Deduplicated: {} -> {} results", before, unique.len());
    unique
}
