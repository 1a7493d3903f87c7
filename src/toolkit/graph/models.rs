

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::core::models::{PaperFields, Reference};


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperNode {
    pub paper_id: i64,
    pub job_id: i64,
    pub external_id: String,
    pub title: String,
    pub year: i32,
    pub citation_count: u32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub main_problem: String,
    pub key_innovation: String,
    pub limitations: String,
    pub research_gaps: String,
}

impl PaperNode {
    pub fn from_fields(paper_id: i64, job_id: i64, fields: &PaperFields) -> Self {
        Self {
            paper_id,
            job_id,
            external_id: fields.external_id.clone(),
            title: fields.title.clone(),
            year: fields.year(),
            citation_count: fields.citation_count,
            abstract_text: fields.abstract_text.clone(),
            main_problem: fields.main_problem.clone(),
            key_innovation: fields.key_innovation.clone(),
            limitations: fields.limitations.clone(),
            research_gaps: fields.research_gaps.clone(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    Paper(PaperNode),
    Author { name: String },
    Concept { name: String },
}

impl GraphNode {
    pub fn as_paper(&self) -> Option<&PaperNode> {
        match self {
            Self::Paper(paper) => Some(paper),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Paper(paper) => &paper.title,
            Self::Author { name } | Self::Concept { name } => name,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeKind {
    /// author -> paper
    Authored,
    /// paper -> concept
    Discusses,
    /// citing paper -> cited paper
    Cites,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Relationship {
    CitesThis,
    CitedByThis,
    SameAuthor,
    SharedConcept,
}

impl Relationship {
    /// Phrase used when describing the link to the answer model.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::CitesThis => "cites this paper",
            Self::CitedByThis => "is cited by this paper",
            Self::SameAuthor => "shares an author",
            Self::SharedConcept => "discusses a shared concept",
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedPaper {
    pub paper_id: i64,
    pub relationship: Relationship,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    pub job_id: i64,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub paper_nodes: usize,
    pub author_nodes: usize,
    pub concept_nodes: usize,
    pub citation_edges: usize,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddPaperSummary {
    pub authors: usize,
    pub concepts: usize,
}

/// Node key helpers. Keys are stable across saves.
pub fn paper_key(paper_id: i64) -> String {
    format!("paper_{paper_id}")
}

pub fn author_key(name: &str) -> String {
    format!("author_{}", name.trim().to_lowercase().replace(' ', "_"))
}

pub fn concept_key(name: &str) -> String {
    format!("concept_{}", name.to_lowercase().replace(' ', "_"))
}
