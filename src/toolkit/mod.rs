

pub mod answer;
pub mod enrich;
pub mod fusion;
pub mod graph;
pub mod ingest;
pub mod keyword;
pub mod semantic;

pub use answer::{AnswerOrchestrator, Confidence, QueryResponse, SourceEntry};
pub use enrich::GraphEnricher;
pub use fusion::{FusedCandidate, FusionEngine, RetrievalDiagnostics};
pub use graph::{GraphError, KnowledgeGraph, RelatedPaper, ResearchOverview};
pub use ingest::{PaperChunker, PaperSection};
pub use keyword::{KeywordHit, KeywordIndex};
pub use semantic::{DisabledSemanticSearch, HttpSemanticSearch, SemanticError, SemanticHit, SemanticSearch};
