

pub mod core;
pub mod llm;
pub mod mcp;
pub mod toolkit;
pub mod utils;

pub use utils::{safe_truncate, truncate_words};


pub use core::config::ScholarConfig;
pub use core::engine::ResearchEngine;
pub use core::error::{Result, ScholarError};
pub use core::models::{Chunk, PaperFields, Reference, SearchFilter, UNSCOPED_JOB_ID};
pub use core::store::{ChunkStore, MemoryChunkStore};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_LLM_MODEL: &str = "llama3.2:latest";


pub const DEFAULT_RETRIEVAL_TOP_K: usize = 20;


pub const DEFAULT_CACHE_SIZE: usize = 256;


pub const DEFAULT_CACHE_TTL: u64 = 300;
