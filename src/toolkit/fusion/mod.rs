

pub mod dedup;
pub mod engine;
pub mod models;
pub mod preprocess;
pub mod rerank;
pub mod rrf;

pub use engine::{FusionEngine, FusionSettings, RetrievalOutcome};
pub use models::{FusedCandidate, RetrievalDiagnostics, RetrievalMethod};
pub use rerank::{LlmReranker, RerankOutcome};
pub use rrf::{rrf_fuse, RRF_K};
