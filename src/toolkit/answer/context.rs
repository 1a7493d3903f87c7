

use crate::toolkit::fusion::FusedCandidate;
use crate::utils::{safe_truncate, truncate_words};

const HEADER_RULE: &str = "═══════════════════════════════════════";
const HEADER_TITLE_CHARS: usize = 80;
const TRUNCATION_MARKER: &str = "\n[Context truncated...]";


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_words: usize,
    pub max_papers: usize,
    pub chunks_per_paper: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_words: 3000,
            max_papers: 10,
            chunks_per_paper: 3,
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() { placeholder } else { value }
}

/// Groups candidates by paper (first-appearance order) under a header per
/// paper, lists graph relations, and cuts the whole text at the word budget.
pub fn build_context(candidates: &[FusedCandidate], limits: &ContextLimits) -> String {
    let mut groups: Vec<(i64, Vec<&FusedCandidate>)> = Vec::new();
    for candidate in candidates {
        match groups.iter_mut().find(|(paper_id, _)| *paper_id == candidate.chunk.paper_id) {
            Some((_, members)) => members.push(candidate),
            None => groups.push((candidate.chunk.paper_id, vec![candidate])),
        }
    }

    let mut parts = Vec::with_capacity(groups.len().min(limits.max_papers));
    for (_, members) in groups.iter().take(limits.max_papers) {
        let Some(first) = members.first() else {
            continue;
        };
        let chunk = &first.chunk;

        let mut part = format!(
            "\n{HEADER_RULE}\nPAPER: {}\nArXiv: {} | Section: {}\n{HEADER_RULE}\n",
            safe_truncate(or_placeholder(&chunk.title, "Unknown"), HEADER_TITLE_CHARS),
            or_placeholder(&chunk.external_paper_id, "N/A"),
            or_placeholder(&chunk.section_label, "N/A"),
        );

        let content: Vec<&str> = members
            .iter()
            .take(limits.chunks_per_paper)
            .map(|c| c.chunk.text.as_str())
            .collect();
        part.push_str(&content.join("\n"));

        let mut related: Vec<String> = Vec::new();
        for member in members {
            for paper in &member.related_papers {
                let line = match &paper.concept {
                    Some(concept) => format!("- {} ({}: {})", paper.title, paper.relationship.describe(), concept),
                    None => format!("- {} ({})", paper.title, paper.relationship.describe()),
                };
                if !related.contains(&line) {
                    related.push(line);
                }
            }
        }
        if !related.is_empty() {
            part.push_str("\nRelated papers:\n");
            part.push_str(&related.join("\n"));
        }

        parts.push(part);
    }

    let context = parts.join("\n");
    match truncate_words(&context, limits.max_words) {
        (kept, true) => format!("{kept}{TRUNCATION_MARKER}"),
        (full, false) => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Chunk;
    use crate::toolkit::graph::{RelatedPaper, Relationship};

    fn candidate(id: &str, paper_id: i64, text: &str) -> FusedCandidate {
        FusedCandidate {
            chunk: Chunk::new(id, paper_id, "method", text).with_title(format!("Paper {paper_id}"), "2101.0000"),
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
    fn test_groups_chunks_under_paper_headers() {
        let candidates = vec![
            candidate("a", 1, "first chunk"),
            candidate("b", 2, "other paper"),
            candidate("c", 1, "second chunk"),
        ];
        let context = build_context(&candidates, &ContextLimits::default());

        assert_eq!(context.matches("PAPER:").count(), 2);
        let first_header = context.find("PAPER: Paper 1").unwrap();
        let second_header = context.find("PAPER: Paper 2").unwrap();
        assert!(first_header < second_header);
        assert!(context.contains("first chunk\nsecond chunk"));
        assert!(context.contains("ArXiv: 2101.0000 | Section: method"));
    }

    #[test]
    fn test_limits_chunks_and_papers() {
        let candidates: Vec<FusedCandidate> = (0..5).map(|i| candidate(&format!("c{i}"), 1, &format!("chunk{i}"))).collect();
        let context = build_context(
            &candidates,
            &ContextLimits {
                max_words: 3000,
                max_papers: 1,
                chunks_per_paper: 2,
            },
        );
        assert!(context.contains("chunk1"));
        assert!(!context.contains("chunk2"));
    }

    #[test]
    fn test_truncates_at_word_budget() {
        let long_text = vec!["word"; 100].join(" ");
        let context = build_context(
            &[candidate("a", 1, &long_text)],
            &ContextLimits {
                max_words: 20,
                ..Default::default()
            },
        );
        assert!(context.ends_with("[Context truncated...]"));
        assert_eq!(context.trim_end_matches(TRUNCATION_MARKER).split_whitespace().count(), 20);
    }

    #[test]
    fn test_lists_relationship_hints() {
        let mut c = candidate("a", 1, "text");
        c.related_papers.push(RelatedPaper {
            paper_id: 2,
            relationship: Relationship::CitesThis,
            title: "Follow-up".to_string(),
            concept: None,
            job_id: 1,
        });
        let context = build_context(&[c], &ContextLimits::default());
        assert!(context.contains("Related papers:\n- Follow-up (cites this paper)"));
    }
}
