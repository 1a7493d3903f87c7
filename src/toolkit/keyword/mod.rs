

pub mod index;
pub mod tokenizer;

pub use index::{IndexSnapshot, IndexStats, KeywordHit, KeywordIndex};
pub use tokenizer::tokenize;
