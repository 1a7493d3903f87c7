

pub mod cache;
pub mod confidence;
pub mod context;
pub mod orchestrator;
pub mod query_type;
pub mod sources;
pub mod summary;

pub use cache::{CacheStats, QueryCache};
pub use confidence::{assess, classify, Confidence, ConfidenceAssessment};
pub use context::{build_context, ContextLimits};
pub use orchestrator::{AnswerOrchestrator, AnswerSettings, QueryResponse, NO_INFORMATION_ANSWER};
pub use query_type::{build_answer_prompt, build_typed_prompt, classify_query, QueryType};
pub use sources::{format_sources, FusionInfo, SourceEntry};
pub use summary::{ResearchSummary, NO_PAPERS_SUMMARY};
