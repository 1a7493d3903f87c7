

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

pub use config::ScholarConfig;
pub use engine::ResearchEngine;
pub use error::{Result, ScholarError};
pub use store::{ChunkStore, MemoryChunkStore, StoreError};
