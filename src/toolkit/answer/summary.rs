use serde::Serialize;

use crate::toolkit::graph::ResearchOverview;

pub const NO_PAPERS_SUMMARY: &str = "No papers indexed yet.";
const SUMMARY_CONCEPTS: usize = 10;
pub(crate) const SUMMARY_TEMPERATURE: f64 = 0.3;
pub(crate) const SUMMARY_MAX_TOKENS: u32 = 1000;

/// Narrative overview of a collection, written by the LLM from graph statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchSummary {
    pub summary: String,
    pub total_papers: usize,
    pub statistics: ResearchOverview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchSummary {
    pub fn empty(statistics: ResearchOverview) -> Self {
        Self {
            summary: NO_PAPERS_SUMMARY.to_string(),
            total_papers: 0,
            statistics,
            error: Some("no_papers".to_string()),
        }
    }
}


pub fn build_summary_prompt(overview: &ResearchOverview) -> String {
    let concepts: String = overview
        .top_concepts
        .iter()
        .take(SUMMARY_CONCEPTS)
        .map(|c| format!("- {} ({} papers)\n", c.concept, c.papers))
        .collect();
    let gaps: String = overview.research_gaps.iter().map(|g| format!("- {g}\n")).collect();

    format!(
        "Analyze this collection of {} research papers and describe the research landscape.\n\n\
         TOP RESEARCH CONCEPTS:\n{concepts}\n\
         STATED GAPS:\n{gaps}\n\
         Cover, in clear paragraphs:\n\
         1. **Main Research Themes** (2-3 dominant themes)\n\
         2. **Common Methodologies**\n\
         3. **Key Findings & Consensus**\n\
         4. **Open Challenges**\n\
         5. **Future Directions**\n\n\
         Refer to the concepts above by name.",
        overview.total_papers
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::graph::ConceptFrequency;

    #[test]
    fn test_summary_prompt_lists_concepts_and_gaps() {
        let overview = ResearchOverview {
            total_papers: 4,
            top_concepts: vec![ConceptFrequency {
                concept: "pruning".to_string(),
                papers: 3,
            }],
            research_gaps: vec!["No results on edge devices".to_string()],
            ..ResearchOverview::default()
        };

        let prompt = build_summary_prompt(&overview);
        assert!(prompt.contains("collection of 4 research papers"));
        assert!(prompt.contains("- pruning (3 papers)"));
        assert!(prompt.contains("- No results on edge devices"));
    }
}
