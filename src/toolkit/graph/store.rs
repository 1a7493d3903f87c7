

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::concepts::extract_concepts;
use super::models::{
    author_key, concept_key, paper_key, AddPaperSummary, EdgeKind, GraphEdge, GraphNode, GraphStats,
    PaperNode, RelatedPaper, Relationship,
};
use crate::core::models::{PaperFields, Reference};


#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Graph has no storage path")]
    NoPath,
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphOptions {
    pub extract_concepts: bool,
    pub max_concepts_per_paper: usize,
    pub citation_similarity_threshold: f64,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            extract_concepts: true,
            max_concepts_per_paper: 10,
            citation_similarity_threshold: 0.8,
        }
    }
}


#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct GraphData {
    pub(crate) nodes: BTreeMap<String, GraphNode>,
    pub(crate) edges: Vec<GraphEdge>,
}

impl GraphData {
    pub(crate) fn paper(&self, key: &str) -> Option<&PaperNode> {
        self.nodes.get(key).and_then(GraphNode::as_paper)
    }

    /// Paper nodes in ascending paper id order.
    pub(crate) fn papers(&self) -> Vec<&PaperNode> {
        let mut papers: Vec<&PaperNode> = self.nodes.values().filter_map(GraphNode::as_paper).collect();
        papers.sort_by_key(|p| p.paper_id);
        papers
    }

    fn has_edge(&self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|e| e.kind == kind && e.source == source && e.target == target)
    }

    fn push_edge(&mut self, source: String, target: String, kind: EdgeKind, reference: Option<Reference>) {
        self.edges.push(GraphEdge {
            source,
            target,
            kind,
            reference,
        });
    }

    /// Distinct neighbours in edge insertion order.
    fn neighbours<'a>(&'a self, key: &str, kind: EdgeKind, outgoing: bool) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| {
                if outgoing && e.source == key {
                    Some(e.target.as_str())
                } else if !outgoing && e.target == key {
                    Some(e.source.as_str())
                } else {
                    None
                }
            })
            .filter(|n| seen.insert(*n))
            .collect()
    }

    fn prune_orphans(&mut self) {
        let connected: HashSet<&str> = self
            .edges
            .iter()
            .flat_map(|e| [e.source.as_str(), e.target.as_str()])
            .collect();
        let orphans: Vec<String> = self
            .nodes
            .iter()
            .filter(|(key, node)| node.as_paper().is_none() && !connected.contains(key.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in orphans {
            self.nodes.remove(&key);
        }
    }
}

/// Word-set Jaccard similarity of two lowercased titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

/// Papers, authors and concepts with typed, directed edges.
///
/// A single lock guards the whole graph; ingestion is rare compared to reads.
/// Saves are serialized separately so a snapshot is always written in the
/// order it was taken.
pub struct KnowledgeGraph {
    pub(crate) data: RwLock<GraphData>,
    save_lock: Mutex<()>,
    path: Option<PathBuf>,
    options: GraphOptions,
}

impl KnowledgeGraph {

    pub fn new(options: GraphOptions) -> Self {
        Self {
            data: RwLock::new(GraphData::default()),
            save_lock: Mutex::new(()),
            path: None,
            options,
        }
    }

    /// Loads the graph stored at `path`, or starts empty if the file is absent.
    pub fn open(path: impl Into<PathBuf>, options: GraphOptions) -> Result<Self, GraphError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let data: GraphData = serde_json::from_str(&raw)?;
            info!(
                "Loaded knowledge graph: {} nodes, {} edges",
                data.nodes.len(),
                data.edges.len()
            );
            data
        } else {
            info!("Initialized new knowledge graph ({} not found)", path.display());
            GraphData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            save_lock: Mutex::new(()),
            path: Some(path),
            options,
        })
    }


    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the whole graph to its file (temp file + rename).
    ///
    /// Blocking; async callers go through `spawn_blocking`.
    pub fn save(&self) -> Result<(), GraphError> {
        let path = self.path.as_ref().ok_or(GraphError::NoPath)?;
        let _guard = self.save_lock.lock();
        let bytes = serde_json::to_vec(&*self.data.read())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path)) {
            std::fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        info!("Saved knowledge graph to {}", path.display());
        Ok(())
    }

    /// Upserts the paper node with its author and concept edges.
    ///
    /// Re-adding a paper replaces its `authored`/`discusses` edges; `cites`
    /// edges are kept.
    pub fn add_paper(&self, paper_id: i64, fields: &PaperFields, job_id: i64) -> AddPaperSummary {
        let key = paper_key(paper_id);
        let concepts = if self.options.extract_concepts {
            extract_concepts(fields, self.options.max_concepts_per_paper)
        } else {
            Vec::new()
        };

        let mut data = self.data.write();
        data.nodes
            .insert(key.clone(), GraphNode::Paper(PaperNode::from_fields(paper_id, job_id, fields)));

        data.edges.retain(|e| match e.kind {
            EdgeKind::Authored => e.target != key,
            EdgeKind::Discusses => e.source != key,
            EdgeKind::Cites => true,
        });

        let mut summary = AddPaperSummary::default();
        for author in &fields.authors {
            if author.trim().is_empty() {
                continue;
            }
            let author_id = author_key(author);
            if data.has_edge(&author_id, &key, EdgeKind::Authored) {
                continue;
            }
            data.nodes.entry(author_id.clone()).or_insert_with(|| GraphNode::Author {
                name: author.trim().to_string(),
            });
            data.push_edge(author_id, key.clone(), EdgeKind::Authored, None);
            summary.authors += 1;
        }

        for concept in concepts {
            let concept_id = concept_key(&concept);
            if data.has_edge(&key, &concept_id, EdgeKind::Discusses) {
                continue;
            }
            data.nodes
                .entry(concept_id.clone())
                .or_insert_with(|| GraphNode::Concept { name: concept.clone() });
            data.push_edge(key.clone(), concept_id, EdgeKind::Discusses, None);
            summary.concepts += 1;
        }

        data.prune_orphans();

        info!(
            "Added paper {} to knowledge graph ({} authors, {} concepts)",
            paper_id, summary.authors, summary.concepts
        );
        summary
    }

    /// Links `paper_id` to every known paper whose title matches a reference.
    ///
    /// Each reference links to at most one paper: the first node, in ascending
    /// paper id order, whose title similarity exceeds the threshold.
    pub fn link_citations(&self, paper_id: i64, references: &[Reference]) -> usize {
        let source = paper_key(paper_id);
        let threshold = self.options.citation_similarity_threshold;
        let mut data = self.data.write();

        if data.paper(&source).is_none() {
            debug!("Citation linking skipped: paper {} not in graph", paper_id);
            return 0;
        }

        let candidates: Vec<(i64, String)> = data
            .papers()
            .into_iter()
            .filter(|p| p.paper_id != paper_id && !p.title.trim().is_empty())
            .map(|p| (p.paper_id, p.title.clone()))
            .collect();

        let mut links_created = 0;
        for reference in references {
            if reference.title.trim().is_empty() {
                continue;
            }
            let matched = candidates
                .iter()
                .find(|(_, title)| title_similarity(&reference.title, title) > threshold);

            if let Some((target_id, _)) = matched {
                let target = paper_key(*target_id);
                if data.has_edge(&source, &target, EdgeKind::Cites) {
                    continue;
                }
                data.push_edge(source.clone(), target, EdgeKind::Cites, Some(reference.clone()));
                links_created += 1;
            }
        }

        if links_created > 0 {
            info!("Created {} citation links for paper {}", links_created, paper_id);
        }
        links_created
    }

    /// Papers linked to `paper_id`, tagged by relationship and unique by paper.
    ///
    /// Order: citing papers, cited papers, same-author papers, shared-concept
    /// papers. Without an explicit `job_id` the source paper's own job scopes
    /// the result; candidates from any other job are dropped.
    pub fn find_related_papers(&self, paper_id: i64, max_results: usize, job_id: Option<i64>) -> Vec<RelatedPaper> {
        let source = paper_key(paper_id);
        let data = self.data.read();

        let Some(source_paper) = data.paper(&source) else {
            return Vec::new();
        };
        let scope = job_id.unwrap_or(source_paper.job_id);

        let mut related: Vec<RelatedPaper> = Vec::new();
        let mut consider = |key: &str, relationship: Relationship, concept: Option<&str>| {
            if key == source {
                return;
            }
            let Some(paper) = data.paper(key) else {
                return;
            };
            if paper.job_id != scope || related.iter().any(|r| r.paper_id == paper.paper_id) {
                return;
            }
            related.push(RelatedPaper {
                paper_id: paper.paper_id,
                relationship,
                title: paper.title.clone(),
                concept: concept.map(String::from),
                job_id: paper.job_id,
            });
        };

        for citing in data.neighbours(&source, EdgeKind::Cites, false) {
            consider(citing, Relationship::CitesThis, None);
        }
        for cited in data.neighbours(&source, EdgeKind::Cites, true) {
            consider(cited, Relationship::CitedByThis, None);
        }
        for author in data.neighbours(&source, EdgeKind::Authored, false) {
            for paper in data.neighbours(author, EdgeKind::Authored, true) {
                consider(paper, Relationship::SameAuthor, None);
            }
        }
        for concept in data.neighbours(&source, EdgeKind::Discusses, true) {
            let name = data.nodes.get(concept).map(GraphNode::name).unwrap_or_default();
            for paper in data.neighbours(concept, EdgeKind::Discusses, false) {
                consider(paper, Relationship::SharedConcept, Some(name));
            }
        }

        related.truncate(max_results);
        related
    }


    pub fn paper(&self, paper_id: i64) -> Option<PaperNode> {
        self.data.read().paper(&paper_key(paper_id)).cloned()
    }


    pub fn statistics(&self) -> GraphStats {
        let data = self.data.read();
        let mut stats = GraphStats {
            total_nodes: data.nodes.len(),
            total_edges: data.edges.len(),
            ..Default::default()
        };
        for node in data.nodes.values() {
            match node {
                GraphNode::Paper(_) => stats.paper_nodes += 1,
                GraphNode::Author { .. } => stats.author_nodes += 1,
                GraphNode::Concept { .. } => stats.concept_nodes += 1,
            }
        }
        stats.citation_edges = data.edges.iter().filter(|e| e.kind == EdgeKind::Cites).count();
        stats
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

/// Logs and swallows a save failure; the in-memory graph stays authoritative.
pub fn save_or_warn(graph: &KnowledgeGraph) -> bool {
    match graph.save() {
        Ok(()) => true,
        Err(GraphError::NoPath) => false,
        Err(e) => {
            warn!("Failed to save knowledge graph: {}", e);
            false
        }
    }
}
