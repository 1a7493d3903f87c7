

pub mod chunker;

pub use chunker::{PaperChunker, PaperSection, WordCount};
