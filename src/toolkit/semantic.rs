

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::core::models::{Chunk, SearchFilter, UNSCOPED_JOB_ID};


#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),

    #[error("Semantic search disabled")]
    Disabled,

    #[error("Backend error: {0}")]
    Backend(String),
}

/// A chunk returned by the vector service with its cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    pub chunk_id: String,
    pub paper_id: i64,
    #[serde(default)]
    pub job_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub section: String,
    pub text: String,
    pub similarity: f64,
}

impl SemanticHit {
    pub fn into_chunk(self) -> Chunk {
        Chunk {
            chunk_id: self.chunk_id,
            paper_id: self.paper_id,
            job_id: self.job_id,
            section_label: self.section,
            title: self.title,
            external_paper_id: self.external_id,
            text: self.text,
        }
    }
}


#[async_trait]
pub trait SemanticSearch: Send + Sync {

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SemanticHit>, SemanticError>;


    async fn index_chunks(&self, paper_id: i64, chunks: &[Chunk]) -> Result<usize, SemanticError>;


    async fn delete_paper(&self, paper_id: i64) -> Result<(), SemanticError>;


    async fn refresh(&self) -> Result<(), SemanticError> {
        Ok(())
    }

    fn backend_name(&self) -> &str;
}


#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paper_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SemanticHit>,
}

#[derive(Debug, Serialize)]
struct IndexRequest<'a> {
    chunks: &'a [Chunk],
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    indexed: usize,
}

/// Client for an external vector service.
///
/// Endpoints, relative to the base url: `POST search`,
/// `POST papers/{id}/chunks`, `DELETE papers/{id}`, `POST refresh`.
pub struct HttpSemanticSearch {
    base_url: Url,
    client: Client,
}

impl HttpSemanticSearch {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SemanticError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)?;
        let client = Client::builder().timeout(timeout).build()?;
        info!("Semantic search adapter initialized (url={})", base_url);
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SemanticError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl SemanticSearch for HttpSemanticSearch {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SemanticHit>, SemanticError> {
        // The vector service treats job 0 as "no scope".
        let request = SearchRequest {
            query,
            top_k,
            job_id: filter.job_id.filter(|job| *job > UNSCOPED_JOB_ID),
            paper_id: filter.paper_id,
        };

        let response = self
            .client
            .post(self.endpoint("search")?)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        debug!("Semantic search returned {} hits", response.results.len());
        Ok(response.results)
    }

    async fn index_chunks(&self, paper_id: i64, chunks: &[Chunk]) -> Result<usize, SemanticError> {
        let response = self
            .client
            .post(self.endpoint(&format!("papers/{paper_id}/chunks"))?)
            .json(&IndexRequest { chunks })
            .send()
            .await?
            .error_for_status()?
            .json::<IndexResponse>()
            .await?;
        Ok(response.indexed)
    }

    async fn delete_paper(&self, paper_id: i64) -> Result<(), SemanticError> {
        self.client
            .delete(self.endpoint(&format!("papers/{paper_id}"))?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), SemanticError> {
        self.client
            .post(self.endpoint("refresh")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}

/// Stand-in used when no vector service is configured; queries run keyword-only.
pub struct DisabledSemanticSearch;

#[async_trait]
impl SemanticSearch for DisabledSemanticSearch {
    async fn search(
        &self,
        _query: &str,
        _top_k: usize,
        _filter: &SearchFilter,
    ) -> Result<Vec<SemanticHit>, SemanticError> {
        Err(SemanticError::Disabled)
    }

    async fn index_chunks(&self, _paper_id: i64, _chunks: &[Chunk]) -> Result<usize, SemanticError> {
        Ok(0)
    }

    async fn delete_paper(&self, _paper_id: i64) -> Result<(), SemanticError> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_relative_paths() {
        let adapter = HttpSemanticSearch::new("http://localhost:8080/api", Duration::from_secs(5)).unwrap();
        assert_eq!(
            adapter.endpoint("papers/7/chunks").unwrap().as_str(),
            "http://localhost:8080/api/papers/7/chunks"
        );
    }

    #[test]
    fn test_search_request_omits_unscoped_job() {
        let request = SearchRequest {
            query: "pruning",
            top_k: 20,
            job_id: Some(0).filter(|job| *job > UNSCOPED_JOB_ID),
            paper_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("job_id").is_none());
        assert_eq!(json["top_k"], 20);
    }

    #[test]
    fn test_hit_into_chunk() {
        let hit = SemanticHit {
            chunk_id: "paper_1_abstract".to_string(),
            paper_id: 1,
            job_id: 2,
            title: "Pruning".to_string(),
            external_id: "2101.00001".to_string(),
            section: "abstract".to_string(),
            text: "text".to_string(),
            similarity: 0.9,
        };
        let chunk = hit.into_chunk();
        assert_eq!(chunk.section_label, "abstract");
        assert_eq!(chunk.external_paper_id, "2101.00001");
    }

    #[tokio::test]
    async fn test_disabled_search_reports_error() {
        let result = DisabledSemanticSearch.search("q", 5, &SearchFilter::default()).await;
        assert!(matches!(result, Err(SemanticError::Disabled)));
    }
}
