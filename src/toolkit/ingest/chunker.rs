

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};
use tracing::debug;

use crate::core::config::ScholarConfig;
use crate::core::error::{Result, ScholarError};
use crate::core::models::{Chunk, PaperFields};

const MIN_CHUNK_CHARS: usize = 50;
const SECTION_ID_CHARS: usize = 30;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PaperSection {
    pub label: String,
    pub text: String,
}

impl PaperSection {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Measures chunks in whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCount;

impl ChunkSizer for WordCount {
    fn size(&self, chunk: &str) -> usize {
        chunk.split_whitespace().count()
    }
}

fn section_slug(label: &str) -> String {
    label
        .replace(' ', "_")
        .replace(['.', ','], "")
        .chars()
        .take(SECTION_ID_CHARS)
        .collect()
}

fn short_hash(text: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
    digest[..8].to_string()
}

/// Splits a paper into indexable chunks: abstract, contributions summary and
/// word windows over each body section.
pub struct PaperChunker {
    splitter: TextSplitter<WordCount>,
    min_section_words: usize,
}

impl PaperChunker {
    pub fn new(window_words: usize, overlap_words: usize, min_section_words: usize) -> Result<Self> {
        let config = ChunkConfig::new(window_words)
            .with_sizer(WordCount)
            .with_overlap(overlap_words)
            .map_err(|e| ScholarError::Config(format!("invalid chunk window: {e}")))?;
        Ok(Self {
            splitter: TextSplitter::new(config),
            min_section_words,
        })
    }


    pub fn from_config(config: &ScholarConfig) -> Result<Self> {
        Self::new(config.chunk_words, config.chunk_overlap_words, config.min_chunk_words)
    }


    pub fn chunk_paper(&self, paper_id: i64, job_id: i64, fields: &PaperFields, sections: &[PaperSection]) -> Vec<Chunk> {
        let make = |chunk_id: String, label: &str, text: &str| {
            Chunk::new(chunk_id, paper_id, label, text)
                .with_job(job_id)
                .with_title(fields.title.clone(), fields.external_id.clone())
        };

        let mut chunks = Vec::new();

        let abstract_text = fields.abstract_text.trim();
        if abstract_text.chars().count() > MIN_CHUNK_CHARS {
            chunks.push(make(format!("paper_{paper_id}_abstract"), "abstract", abstract_text));
        }

        let has_contributions = [
            &fields.main_problem,
            &fields.key_innovation,
            &fields.core_methodology,
            &fields.major_results,
        ]
        .iter()
        .any(|field| !field.trim().is_empty());
        if has_contributions {
            let summary = format!(
                "Problem: {}\nInnovation: {}\nMethodology: {}\nResults: {}",
                fields.main_problem.trim(),
                fields.key_innovation.trim(),
                fields.core_methodology.trim(),
                fields.major_results.trim()
            );
            if summary.chars().count() > MIN_CHUNK_CHARS {
                chunks.push(make(format!("paper_{paper_id}_contributions"), "contributions", &summary));
            }
        }

        for section in sections {
            if section.label.to_lowercase().contains("reference") {
                continue;
            }
            if section.text.split_whitespace().count() < self.min_section_words {
                continue;
            }

            let slug = section_slug(&section.label);
            for (index, window) in self.splitter.chunks(&section.text).enumerate() {
                if window.trim().chars().count() < MIN_CHUNK_CHARS {
                    continue;
                }
                let chunk_id = format!("paper_{paper_id}_{slug}_{index}_{}", short_hash(window));
                chunks.push(make(chunk_id, &section.label, window));
            }
        }

        debug!("Chunked paper {} into {} chunks", paper_id, chunks.len());
        chunks
    }
}
