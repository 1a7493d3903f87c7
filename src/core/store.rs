

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::Chunk;


#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Datastore unavailable: {0}")]
    Unavailable(String),

    #[error("Persist task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Datastore of record for indexed chunks and paper job tags.
///
/// The keyword index is always rebuilt from `fetch_all_chunks`, never
/// persisted on its own.
#[async_trait]
pub trait ChunkStore: Send + Sync {

    async fn fetch_all_chunks(&self) -> Result<Vec<Chunk>, StoreError>;


    async fn fetch_paper_job(&self, paper_id: i64) -> Result<Option<i64>, StoreError>;

    /// Retracts every chunk of `paper_id` and stores `chunks` in their place.
    async fn replace_paper_chunks(&self, paper_id: i64, chunks: Vec<Chunk>) -> Result<usize, StoreError>;
}


#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    paper_jobs: HashMap<i64, i64>,
    #[serde(default)]
    chunks: Vec<Chunk>,
}


/// In-memory chunk store, optionally mirrored to a JSON file after each write.
///
/// Writes to the file are serialized by `persist_lock`; the snapshot is taken
/// while holding it so an older snapshot never replaces a newer one.
pub struct MemoryChunkStore {
    papers: RwLock<BTreeMap<i64, Vec<Chunk>>>,
    paper_jobs: RwLock<HashMap<i64, i64>>,
    persist_lock: Mutex<()>,
    path: Option<PathBuf>,
}

impl MemoryChunkStore {

    pub fn new() -> Self {
        Self {
            papers: RwLock::new(BTreeMap::new()),
            paper_jobs: RwLock::new(HashMap::new()),
            persist_lock: Mutex::new(()),
            path: None,
        }
    }

    /// Opens a JSON-backed store, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::new();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&raw)?;
            let mut papers: BTreeMap<i64, Vec<Chunk>> = BTreeMap::new();
            for chunk in file.chunks {
                papers.entry(chunk.paper_id).or_default().push(chunk);
            }
            info!(
                "Chunk store loaded from {}: {} papers",
                path.display(),
                papers.len()
            );
            store.papers = RwLock::new(papers);
            store.paper_jobs = RwLock::new(file.paper_jobs);
        } else {
            info!("Chunk store {} not found, starting empty", path.display());
        }

        store.path = Some(path);
        Ok(store)
    }


    pub fn set_paper_job(&self, paper_id: i64, job_id: i64) {
        self.paper_jobs.write().insert(paper_id, job_id);
    }


    pub fn paper_count(&self) -> usize {
        self.papers.read().len()
    }

    async fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        let file = StoreFile {
            paper_jobs: self.paper_jobs.read().clone(),
            chunks: self.papers.read().values().flatten().cloned().collect(),
        };
        let bytes = serde_json::to_vec(&file)?;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes)).await??;
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path)) {
        std::fs::remove_file(&tmp).ok();
        return Err(e.into());
    }
    Ok(())
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn fetch_all_chunks(&self) -> Result<Vec<Chunk>, StoreError> {
        Ok(self.papers.read().values().flatten().cloned().collect())
    }

    async fn fetch_paper_job(&self, paper_id: i64) -> Result<Option<i64>, StoreError> {
        if let Some(job_id) = self.paper_jobs.read().get(&paper_id) {
            return Ok(Some(*job_id));
        }
        Ok(self
            .papers
            .read()
            .get(&paper_id)
            .and_then(|chunks| chunks.first())
            .map(|chunk| chunk.job_id))
    }

    async fn replace_paper_chunks(&self, paper_id: i64, chunks: Vec<Chunk>) -> Result<usize, StoreError> {
        let stored = {
            let mut papers = self.papers.write();
            papers.remove(&paper_id);

            let taken: HashSet<String> = papers
                .values()
                .flatten()
                .map(|c| c.chunk_id.clone())
                .collect();

            let mut seen = HashSet::new();
            let mut accepted = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                if chunk.paper_id != paper_id {
                    warn!(
                        "Skipping chunk {} of paper {} while indexing paper {}",
                        chunk.chunk_id, chunk.paper_id, paper_id
                    );
                    continue;
                }
                if taken.contains(&chunk.chunk_id) || !seen.insert(chunk.chunk_id.clone()) {
                    warn!("Skipping duplicate chunk id {}", chunk.chunk_id);
                    continue;
                }
                accepted.push(chunk);
            }

            let stored = accepted.len();
            if !accepted.is_empty() {
                papers.insert(paper_id, accepted);
            }
            stored
        };

        debug!("Stored {} chunks for paper {}", stored, paper_id);

        if let Some(path) = &self.path {
            self.persist(path).await?;
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_retracts_previous_chunks() {
        let store = MemoryChunkStore::new();
        store
            .replace_paper_chunks(
                1,
                vec![
                    Chunk::new("p1_a", 1, "intro", "first version"),
                    Chunk::new("p1_b", 1, "method", "first version"),
                ],
            )
            .await
            .unwrap();
        store
            .replace_paper_chunks(1, vec![Chunk::new("p1_c", 1, "intro", "second version")])
            .await
            .unwrap();

        let chunks = store.fetch_all_chunks().await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "p1_c");
    }

    #[tokio::test]
    async fn test_replace_skips_foreign_and_duplicate_chunks() {
        let store = MemoryChunkStore::new();
        store
            .replace_paper_chunks(2, vec![Chunk::new("shared", 2, "intro", "text")])
            .await
            .unwrap();

        let stored = store
            .replace_paper_chunks(
                1,
                vec![
                    Chunk::new("a", 1, "intro", "text"),
                    Chunk::new("a", 1, "intro", "again"),
                    Chunk::new("shared", 1, "intro", "collides"),
                    Chunk::new("b", 3, "intro", "wrong paper"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn test_paper_job_lookup() {
        let store = MemoryChunkStore::new();
        store
            .replace_paper_chunks(4, vec![Chunk::new("c", 4, "intro", "text").with_job(9)])
            .await
            .unwrap();
        assert_eq!(store.fetch_paper_job(4).await.unwrap(), Some(9));

        store.set_paper_job(4, 11);
        assert_eq!(store.fetch_paper_job(4).await.unwrap(), Some(11));
        assert_eq!(store.fetch_paper_job(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_persists_and_reloads() {
        let path = std::env::temp_dir().join(format!("scholar-store-{}.json", uuid::Uuid::new_v4()));
        {
            let store = MemoryChunkStore::open(&path).unwrap();
            store.set_paper_job(1, 3);
            store
                .replace_paper_chunks(1, vec![Chunk::new("c1", 1, "intro", "persisted text").with_job(3)])
                .await
                .unwrap();
        }

        let reopened = MemoryChunkStore::open(&path).unwrap();
        assert_eq!(reopened.paper_count(), 1);
        assert_eq!(reopened.fetch_paper_job(1).await.unwrap(), Some(3));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replaces_all_reach_disk() {
        let path = std::env::temp_dir().join(format!("scholar-store-{}.json", uuid::Uuid::new_v4()));
        let store = std::sync::Arc::new(MemoryChunkStore::open(&path).unwrap());

        let tasks: Vec<_> = (1..=16i64)
            .map(|paper_id| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    let chunk = Chunk::new(format!("p{paper_id}"), paper_id, "intro", "text");
                    store.replace_paper_chunks(paper_id, vec![chunk]).await
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }

        let reopened = MemoryChunkStore::open(&path).unwrap();
        assert_eq!(reopened.paper_count(), 16);
        assert_eq!(reopened.fetch_all_chunks().await.unwrap().len(), 16);

        std::fs::remove_file(&path).ok();
    }
}
