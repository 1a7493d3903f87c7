use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use tracing::debug;

use crate::utils::safe_truncate;

const COMPARED_TITLES: usize = 5;
const TITLE_CHARS: usize = 60;

/// What a question asks for; selects the answer prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryType {
    Comparison,
    Methodology,
    Gap,
    Findings,
    Summary,
    General,
}

lazy_static! {
    static ref QUERY_PATTERNS: Vec<(QueryType, Regex)> = vec![
        (
            QueryType::Comparison,
            Regex::new(r"\b(compare|contrast|difference|versus|vs|across|between)\b").expect("comparison pattern compiles"),
        ),
        (
            QueryType::Methodology,
            Regex::new(r"\b(method|approach|technique|algorithm|implementation|how)\b").expect("methodology pattern compiles"),
        ),
        (
            QueryType::Gap,
            Regex::new(r"\b(gap|limitation|challenge|problem|issue|future work|missing)\b").expect("gap pattern compiles"),
        ),
        (
            QueryType::Findings,
            Regex::new(r"\b(result|finding|outcome|performance|accuracy|metric)\b").expect("findings pattern compiles"),
        ),
        (
            QueryType::Summary,
            Regex::new(r"\b(summarize|overview|main|key|important)\b").expect("summary pattern compiles"),
        ),
    ];
}

/// Every type whose keywords appear in the question, or `[General]`.
///
/// Matching is on whole lowercase words, so "methods" is not "method".
pub fn classify_query(question: &str) -> Vec<QueryType> {
    let lowered = question.to_lowercase();
    let mut types: Vec<QueryType> = QUERY_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(query_type, _)| *query_type)
        .collect();
    if types.is_empty() {
        types.push(QueryType::General);
    }
    debug!("Query classified as {:?}", types);
    types
}

/// Picks the prompt for the strongest type: comparison, then gap, then
/// methodology. Everything else gets the general prompt.
pub fn build_typed_prompt(question: &str, context: &str, types: &[QueryType], titles: &[&str]) -> String {
    if types.contains(&QueryType::Comparison) {
        comparison_prompt(question, context, titles)
    } else if types.contains(&QueryType::Gap) {
        gap_prompt(question, context)
    } else if types.contains(&QueryType::Methodology) {
        methodology_prompt(question, context)
    } else {
        build_answer_prompt(question, context)
    }
}


pub fn build_answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the following question based ONLY on the provided research context.\n\n\
         CONTEXT FROM RESEARCH PAPERS:\n{context}\n\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         1. Answer comprehensively using information from the papers\n\
         2. Cite specific papers: [Paper Title - ArXiv ID]\n\
         3. If papers provide different perspectives, mention all\n\
         4. Be specific about methods, results, and findings\n\
         5. Use the listed related papers to explain how the works connect\n\
         6. If information is insufficient, clearly state it\n\n\
         ANSWER:"
    )
}

fn comparison_prompt(question: &str, context: &str, titles: &[&str]) -> String {
    let mut listed: Vec<String> = Vec::new();
    for title in titles {
        let title = safe_truncate(title, TITLE_CHARS);
        if !listed.contains(&title) {
            listed.push(title);
        }
        if listed.len() == COMPARED_TITLES {
            break;
        }
    }
    let papers: String = listed
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}\n", i + 1, title))
        .collect();

    format!(
        "You are comparing several research papers to answer a comparative question.\n\n\
         PAPERS ANALYZED:\n{papers}\n\
         CONTEXT FROM RESEARCH PAPERS:\n{context}\n\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         1. Compare the approaches across all papers, not one at a time\n\
         2. State similarities and differences explicitly\n\
         3. Write contrasts as \"[Paper A] does X, while [Paper B] does Y\"\n\
         4. Cite specific papers: [Paper Title - ArXiv ID]\n\
         5. Use a table when comparing several dimensions\n\
         6. Point out where the papers agree and where they disagree\n\n\
         COMPARATIVE ANALYSIS:"
    )
}

fn gap_prompt(question: &str, context: &str) -> String {
    format!(
        "You are reviewing research papers for gaps, limitations and future directions.\n\n\
         CONTEXT FROM RESEARCH PAPERS:\n{context}\n\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         1. List the limitations each paper states\n\
         2. Infer gaps from what the papers do not address\n\
         3. Group challenges shared by several papers\n\
         4. Collect the future work the papers suggest\n\
         5. Cite specific papers: [Paper Title - ArXiv ID]\n\n\
         FORMAT:\n\
         **Stated Limitations:**\n\
         **Common Challenges:**\n\
         **Future Research Directions:**\n\
         **Methodological Gaps:**\n\n\
         GAP ANALYSIS:"
    )
}

fn methodology_prompt(question: &str, context: &str) -> String {
    format!(
        "You are explaining the methods used in several research papers.\n\n\
         CONTEXT FROM RESEARCH PAPERS:\n{context}\n\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         1. Describe the core approach of each relevant paper\n\
         2. Break algorithms down step by step\n\
         3. Name the key modifications each paper introduces\n\
         4. Note datasets and experimental setup\n\
         5. Cite specific papers: [Paper Title - ArXiv ID]\n\n\
         STRUCTURE:\n\
         - Overview of approaches\n\
         - Method breakdown per paper\n\
         - Key differences\n\
         - Implementation considerations\n\n\
         METHODOLOGY EXPLANATION:"
    )
}
