

pub mod concepts;
pub mod models;
pub mod overview;
pub mod store;

pub use models::{
    AddPaperSummary, EdgeKind, GraphEdge, GraphNode, GraphStats, PaperNode, RelatedPaper, Relationship,
};
pub use overview::{ConceptFrequency, InfluentialPaper, ResearchOverview};
pub use store::{save_or_warn, title_similarity, GraphError, GraphOptions, KnowledgeGraph};
