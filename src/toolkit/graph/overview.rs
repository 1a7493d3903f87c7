

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::models::{paper_key, EdgeKind, GraphNode};
use super::store::KnowledgeGraph;

const TOP_CONCEPTS: usize = 10;
const TOP_PAPERS: usize = 5;
const TOP_TEXTS: usize = 5;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptFrequency {
    pub concept: String,
    pub papers: usize,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluentialPaper {
    pub paper_id: i64,
    pub title: String,
    pub citation_count: u32,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchOverview {
    pub total_papers: usize,
    pub total_concepts: usize,
    pub top_concepts: Vec<ConceptFrequency>,
    pub most_influential_papers: Vec<InfluentialPaper>,
    pub common_problems: Vec<String>,
    pub key_innovations: Vec<String>,
    pub research_gaps: Vec<String>,
}

fn first_texts<'a>(texts: impl Iterator<Item = &'a String>) -> Vec<String> {
    texts
        .filter(|text| !text.trim().is_empty())
        .take(TOP_TEXTS)
        .cloned()
        .collect()
}

impl KnowledgeGraph {
    /// Aggregates the research landscape, optionally limited to one job.
    pub fn research_overview(&self, job_id: Option<i64>) -> ResearchOverview {
        let data = self.data.read();
        let papers: Vec<_> = data
            .papers()
            .into_iter()
            .filter(|p| job_id.is_none_or(|job| p.job_id == job))
            .collect();
        let in_scope: HashSet<String> = papers.iter().map(|p| paper_key(p.paper_id)).collect();

        let common_problems = first_texts(papers.iter().map(|p| &p.main_problem));
        let key_innovations = first_texts(papers.iter().map(|p| &p.key_innovation));
        let research_gaps = first_texts(papers.iter().map(|p| &p.research_gaps));

        let mut concepts: Vec<ConceptFrequency> = data
            .nodes
            .iter()
            .filter_map(|(key, node)| match node {
                GraphNode::Concept { name } => {
                    let discussing: HashSet<&str> = data
                        .edges
                        .iter()
                        .filter(|e| e.kind == EdgeKind::Discusses && &e.target == key)
                        .filter(|e| in_scope.contains(&e.source))
                        .map(|e| e.source.as_str())
                        .collect();
                    Some(ConceptFrequency {
                        concept: name.clone(),
                        papers: discussing.len(),
                    })
                }
                _ => None,
            })
            .filter(|c| c.papers > 0)
            .collect();
        let total_concepts = concepts.len();
        concepts.sort_by(|a, b| b.papers.cmp(&a.papers).then_with(|| a.concept.cmp(&b.concept)));
        concepts.truncate(TOP_CONCEPTS);

        let mut influential: Vec<InfluentialPaper> = papers
            .iter()
            .map(|p| InfluentialPaper {
                paper_id: p.paper_id,
                title: p.title.clone(),
                citation_count: p.citation_count,
            })
            .collect();
        influential.sort_by(|a, b| b.citation_count.cmp(&a.citation_count).then(a.paper_id.cmp(&b.paper_id)));
        influential.truncate(TOP_PAPERS);

        ResearchOverview {
            total_papers: papers.len(),
            total_concepts,
            top_concepts: concepts,
            most_influential_papers: influential,
            common_problems,
            key_innovations,
            research_gaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::models::PaperFields;
    use crate::toolkit::graph::KnowledgeGraph;

    fn paper(title: &str, citations: u32, problem: &str, categories: &[&str]) -> PaperFields {
        let mut fields = PaperFields::new("", title);
        fields.citation_count = citations;
        fields.main_problem = problem.to_string();
        fields.categories = categories.iter().map(|c| c.to_string()).collect();
        fields
    }

    #[test]
    fn test_overview_ranks_concepts_and_papers() {
        let graph = KnowledgeGraph::default();
        graph.add_paper(1, &paper("A", 10, "scaling", &["cs.LG", "cs.CL"]), 1);
        graph.add_paper(2, &paper("B", 50, "", &["cs.LG"]), 1);
        graph.add_paper(3, &paper("C", 5, "efficiency", &["cs.CV"]), 2);

        let overview = graph.research_overview(None);
        assert_eq!(overview.total_papers, 3);
        assert_eq!(overview.total_concepts, 3);
        assert_eq!(overview.top_concepts[0].concept, "cs.LG");
        assert_eq!(overview.top_concepts[0].papers, 2);
        assert_eq!(overview.most_influential_papers[0].paper_id, 2);
        assert_eq!(overview.common_problems, vec!["scaling", "efficiency"]);
    }

    #[test]
    fn test_overview_scoped_to_job() {
        let graph = KnowledgeGraph::default();
        graph.add_paper(1, &paper("A", 10, "scaling", &["cs.LG"]), 1);
        graph.add_paper(3, &paper("C", 5, "efficiency", &["cs.CV"]), 2);

        let overview = graph.research_overview(Some(2));
        assert_eq!(overview.total_papers, 1);
        assert_eq!(overview.total_concepts, 1);
        assert_eq!(overview.top_concepts[0].concept, "cs.CV");
        assert_eq!(overview.common_problems, vec!["efficiency"]);
    }
}
