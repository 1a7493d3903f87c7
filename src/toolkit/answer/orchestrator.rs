

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::cache::{CacheStats, QueryCache};
use super::confidence::{assess, Confidence};
use super::context::{build_context, ContextLimits};
use super::query_type::{build_typed_prompt, classify_query, QueryType};
use super::sources::{format_sources, SourceEntry};
use super::summary::{build_summary_prompt, ResearchSummary, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE};
use crate::core::error::{Result, ScholarError};
use crate::core::models::SearchFilter;
use crate::llm::providers::base::{GenerationOptions, LlmMetadata, LlmProvider};
use crate::toolkit::enrich::GraphEnricher;
use crate::toolkit::fusion::{FusionEngine, RetrievalDiagnostics};
use crate::toolkit::graph::ResearchOverview;

pub const NO_INFORMATION_ANSWER: &str = "No relevant information found. Try rephrasing your question.";
pub const GENERATION_FAILED_ANSWER: &str =
    "Relevant passages were found, but an answer could not be generated. Please review the sources listed below.";

const ANSWER_SYSTEM_PROMPT: &str = "You are a research expert analyzing scientific papers.";


#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub query_id: String,
    pub answer: String,
    pub confidence: Confidence,
    pub query_types: Vec<QueryType>,
    pub sources: Vec<SourceEntry>,
    pub papers_analyzed: usize,
    pub average_relevance: f64,
    pub retrieval_diagnostics: RetrievalDiagnostics,
    /// Provider that wrote the answer, including whether the fallback was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<LlmMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub cached: bool,
    pub elapsed_ms: u64,
}

impl QueryResponse {
    fn empty(answer: String, confidence: Confidence) -> Self {
        Self {
            query_id: Uuid::new_v4().to_string(),
            answer,
            confidence,
            query_types: Vec::new(),
            sources: Vec::new(),
            papers_analyzed: 0,
            average_relevance: 0.0,
            retrieval_diagnostics: RetrievalDiagnostics::default(),
            generated_by: None,
            generation_error: None,
            error: None,
            cached: false,
            elapsed_ms: 0,
        }
    }


    pub fn no_information(answer: impl Into<String>) -> Self {
        Self::empty(answer.into(), Confidence::Low)
    }


    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut response = Self::empty(format!("Error processing query: {message}"), Confidence::Error);
        response.error = Some(message);
        response
    }
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerSettings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub context: ContextLimits,
    pub timeout: Duration,
}


fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "query pipeline panicked".to_string()
    }
}

/// Turns a question into a cited answer. Always returns a structured response.
pub struct AnswerOrchestrator {
    fusion: FusionEngine,
    enricher: GraphEnricher,
    llm: Arc<dyn LlmProvider>,
    cache: Option<QueryCache>,
    settings: AnswerSettings,
}

impl AnswerOrchestrator {
    pub fn new(
        fusion: FusionEngine,
        enricher: GraphEnricher,
        llm: Arc<dyn LlmProvider>,
        cache: Option<QueryCache>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            fusion,
            enricher,
            llm,
            cache,
            settings,
        }
    }

    pub async fn query(&self, question: &str, job_id: Option<i64>, paper_id: Option<i64>) -> QueryResponse {
        let started = Instant::now();
        info!("Hybrid query: {}", question);

        let cache_key = QueryCache::make_key(question, job_id, paper_id);
        if let Some(cache) = &self.cache {
            if let Some(mut cached) = cache.get(&cache_key) {
                cached.cached = true;
                cached.elapsed_ms = started.elapsed().as_millis() as u64;
                return cached;
            }
        }

        let outcome = AssertUnwindSafe(self.run(question, job_id, paper_id)).catch_unwind().await;
        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!("Hybrid query failed: {}", e);
                QueryResponse::failure(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Hybrid query panicked: {}", message);
                QueryResponse::failure(message)
            }
        };
        response.elapsed_ms = started.elapsed().as_millis() as u64;

        if let Some(cache) = &self.cache {
            if response.confidence != Confidence::Error && response.generation_error.is_none() {
                cache.set(&cache_key, response.clone());
            }
        }

        info!(
            "Hybrid query completed: {:?} confidence, {} sources, {}ms",
            response.confidence,
            response.sources.len(),
            response.elapsed_ms
        );
        response
    }

    async fn run(&self, question: &str, job_id: Option<i64>, paper_id: Option<i64>) -> Result<QueryResponse> {
        if question.trim().is_empty() {
            return Err(ScholarError::Validation("question must not be empty".into()));
        }

        let query_types = classify_query(question);
        let filter = SearchFilter::new(job_id, paper_id);
        let outcome = self.fusion.retrieve(question, &filter).await;

        if outcome.candidates.is_empty() {
            let mut response = QueryResponse::no_information(NO_INFORMATION_ANSWER);
            response.query_types = query_types;
            response.retrieval_diagnostics = outcome.diagnostics;
            return Ok(response);
        }

        let mut candidates = outcome.candidates;
        self.enricher.enrich(&mut candidates, job_id);

        let context = build_context(&candidates, &self.settings.context);
        let assessment = assess(&candidates);
        let sources = format_sources(&candidates);

        let titles: Vec<&str> = sources.iter().map(|source| source.title.as_str()).collect();
        let prompt = build_typed_prompt(question, &context, &query_types, &titles);
        let options = GenerationOptions::new(self.settings.temperature, self.settings.max_tokens);
        let generated = tokio::time::timeout(
            self.settings.timeout,
            self.llm.generate(ANSWER_SYSTEM_PROMPT, &prompt, &options),
        )
        .await;

        let (answer, confidence, generated_by, generation_error) = match generated {
            Ok(Ok((answer, metadata))) => {
                if metadata.fallback_used {
                    warn!(
                        "Answer written by fallback model {} after {} failed",
                        metadata.model,
                        metadata.original_provider.as_deref().unwrap_or("primary")
                    );
                }
                (answer.trim().to_string(), assessment.confidence, Some(metadata), None)
            }
            Ok(Err(e)) => {
                warn!("Answer generation failed: {}", e);
                (GENERATION_FAILED_ANSWER.to_string(), Confidence::Low, None, Some(e.to_string()))
            }
            Err(_) => {
                warn!("Answer generation timed out after {:?}", self.settings.timeout);
                let message = format!("timed out after {}s", self.settings.timeout.as_secs());
                (GENERATION_FAILED_ANSWER.to_string(), Confidence::Low, None, Some(message))
            }
        };

        Ok(QueryResponse {
            query_id: Uuid::new_v4().to_string(),
            answer,
            confidence,
            query_types,
            sources,
            papers_analyzed: assessment.papers,
            average_relevance: assessment.average_relevance,
            retrieval_diagnostics: outcome.diagnostics,
            generated_by,
            generation_error,
            error: None,
            cached: false,
            elapsed_ms: 0,
        })
    }


    /// Has the LLM describe the landscape in `overview`. Never fails; errors
    /// land in `ResearchSummary::error`.
    pub async fn research_summary(&self, overview: ResearchOverview) -> ResearchSummary {
        if overview.total_papers == 0 {
            return ResearchSummary::empty(overview);
        }

        let prompt = build_summary_prompt(&overview);
        let options = GenerationOptions::new(SUMMARY_TEMPERATURE, SUMMARY_MAX_TOKENS);
        let generated = tokio::time::timeout(
            self.settings.timeout,
            self.llm.generate(ANSWER_SYSTEM_PROMPT, &prompt, &options),
        )
        .await;

        let (summary, error) = match generated {
            Ok(Ok((summary, _))) => (summary.trim().to_string(), None),
            Ok(Err(e)) => {
                warn!("Research summary generation failed: {}", e);
                (format!("Error: {e}"), Some(e.to_string()))
            }
            Err(_) => {
                let message = format!("timed out after {}s", self.settings.timeout.as_secs());
                warn!("Research summary {}", message);
                (format!("Error: {message}"), Some(message))
            }
        };

        ResearchSummary {
            summary,
            total_papers: overview.total_papers,
            statistics: overview,
            error,
        }
    }


    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }


    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(QueryCache::stats)
    }
}
