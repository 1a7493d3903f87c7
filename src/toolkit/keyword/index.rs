

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::tokenizer::tokenize;
use crate::core::error::{Result, ScholarError};
use crate::core::models::{Chunk, SearchFilter};
use crate::core::store::ChunkStore;

pub const BM25_K1: f64 = 1.5;
pub const BM25_B: f64 = 0.75;


#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
    pub chunk: Chunk,
    pub score: f64,
    /// `score` divided by the best score in the result set.
    pub relevance: f64,
}


#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub vocabulary: usize,
    pub avg_length: f64,
    pub built_at: DateTime<Utc>,
}

/// Immutable BM25 tables built from one datastore read.
#[derive(Debug)]
pub struct IndexSnapshot {
    chunks: Vec<Chunk>,
    postings: HashMap<String, Vec<usize>>,
    term_freqs: Vec<HashMap<String, u32>>,
    lengths: Vec<usize>,
    avg_length: f64,
    built_at: DateTime<Utc>,
}

impl IndexSnapshot {

    pub fn empty() -> Self {
        Self::build(Vec::new())
    }


    pub fn build(chunks: Vec<Chunk>) -> Self {
        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut lengths = Vec::with_capacity(chunks.len());

        for (doc, chunk) in chunks.iter().enumerate() {
            let tokens = tokenize(&chunk.text);
            lengths.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for token in freqs.keys() {
                postings.entry(token.clone()).or_default().push(doc);
            }
            term_freqs.push(freqs);
        }

        let avg_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        Self {
            chunks,
            postings,
            term_freqs,
            lengths,
            avg_length,
            built_at: Utc::now(),
        }
    }


    pub fn len(&self) -> usize {
        self.chunks.len()
    }


    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }


    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.chunks.len(),
            vocabulary: self.postings.len(),
            avg_length: self.avg_length,
            built_at: self.built_at,
        }
    }

    /// BM25 over the snapshot. Repeated query tokens count once per occurrence.
    pub fn search(&self, query: &str, top_k: usize, filter: &SearchFilter) -> Vec<KeywordHit> {
        if self.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let total = self.chunks.len() as f64;
        // Every indexed chunk may be token-free, leaving a zero average.
        let avg_length = if self.avg_length > 0.0 { self.avg_length } else { 1.0 };
        let mut scores: HashMap<usize, f64> = HashMap::new();

        for token in &query_tokens {
            let Some(docs) = self.postings.get(token) else {
                continue;
            };
            let n_t = docs.len() as f64;
            let idf = ((total - n_t + 0.5) / (n_t + 0.5) + 1.0).ln();

            for &doc in docs {
                if !filter.admits(&self.chunks[doc]) {
                    continue;
                }
                let tf = f64::from(self.term_freqs[doc].get(token).copied().unwrap_or(0));
                let length = self.lengths[doc] as f64;
                let numerator = idf * tf * (BM25_K1 + 1.0);
                let denominator = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (length / avg_length));
                *scores.entry(doc).or_insert(0.0) += numerator / denominator;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));

        let max_score = ranked.first().map(|(_, s)| *s).unwrap_or(0.0);
        ranked.truncate(top_k);

        debug!(
            "Keyword search: {} tokens, {} hits (max_score={:.3})",
            query_tokens.len(),
            ranked.len(),
            max_score
        );

        ranked
            .into_iter()
            .map(|(doc, score)| KeywordHit {
                chunk: self.chunks[doc].clone(),
                score,
                relevance: (score / max_score).min(1.0),
            })
            .collect()
    }
}

/// Shared BM25 index over the datastore.
///
/// Readers clone the current `Arc<IndexSnapshot>`; `refresh` builds a
/// replacement without holding the pointer lock and swaps it in.
pub struct KeywordIndex {
    store: Arc<dyn ChunkStore>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    refresh_lock: Mutex<()>,
}

impl KeywordIndex {

    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::empty())),
            refresh_lock: Mutex::new(()),
        }
    }


    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().clone()
    }

    /// Rebuilds the index from the datastore. Concurrent refreshes are serialized.
    pub async fn refresh(&self) -> Result<IndexStats> {
        let _guard = self.refresh_lock.lock().await;

        let chunks = self.store.fetch_all_chunks().await?;
        let snapshot = tokio::task::spawn_blocking(move || IndexSnapshot::build(chunks))
            .await
            .map_err(|e| ScholarError::Index(format!("index build task failed: {e}")))?;

        let stats = snapshot.stats();
        *self.snapshot.write() = Arc::new(snapshot);

        info!(
            "Keyword index rebuilt: {} chunks, {} terms, avg_length={:.1}",
            stats.documents, stats.vocabulary, stats.avg_length
        );
        Ok(stats)
    }


    pub fn search(&self, query: &str, top_k: usize, filter: &SearchFilter) -> Vec<KeywordHit> {
        self.snapshot().search(query, top_k, filter)
    }


    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }
}
