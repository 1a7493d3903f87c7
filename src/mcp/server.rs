use rmcp::{
    handler::server::{
        router::tool::ToolRouter,
        router::prompt::PromptRouter,
        wrapper::Parameters,
    },
    model::*,
    tool, tool_handler, tool_router,
    prompt, prompt_handler, prompt_router,
    transport::stdio,
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::ScholarConfig;
use crate::core::engine::ResearchEngine;
use crate::core::error::ScholarError;
use crate::core::models::{PaperFields, Reference};
use crate::toolkit::ingest::PaperSection;

const DEFAULT_RELATED_RESULTS: usize = 5;


#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct QueryPapersParams {
    #[schemars(description = "Research question to answer from the indexed papers")]
    pub question: String,
    #[schemars(description = "Optional job scope; unscoped papers stay visible")]
    pub job_id: Option<i64>,
    #[schemars(description = "Optional paper to restrict retrieval to")]
    pub paper_id: Option<i64>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct IndexPaperParams {
    #[schemars(description = "Internal paper identifier")]
    pub paper_id: i64,
    #[schemars(description = "Paper metadata and extracted contributions")]
    pub fields: PaperFields,
    #[schemars(description = "Paper body sections as {label, text}")]
    #[serde(default)]
    pub sections: Vec<PaperSection>,
    #[schemars(description = "Optional job scope for the new chunks")]
    pub job_id: Option<i64>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct AddToGraphParams {
    #[schemars(description = "Internal paper identifier")]
    pub paper_id: i64,
    #[schemars(description = "Paper metadata (title, authors, categories, contributions)")]
    pub fields: PaperFields,
    #[schemars(description = "Bibliography entries; titles are matched against known papers")]
    #[serde(default)]
    pub references: Vec<Reference>,
    #[schemars(description = "Optional job scope (default: the paper's job in the datastore)")]
    pub job_id: Option<i64>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct RelatedPapersParams {
    #[schemars(description = "Paper to start from")]
    pub paper_id: i64,
    #[schemars(description = "Max results (default: 5)")]
    pub max_results: Option<usize>,
    #[schemars(description = "Optional job scope (default: the paper's own job)")]
    pub job_id: Option<i64>,
}

#[derive(Debug, Deserialize, rmcp::schemars::JsonSchema)]
pub struct ResearchOverviewParams {
    #[schemars(description = "Optional job scope")]
    pub job_id: Option<i64>,
}


#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LiteratureReviewArgs {
    #[schemars(description = "Topic to review")]
    pub topic: String,
    #[schemars(description = "Optional job scope")]
    pub job_id: Option<i64>,
}


#[derive(Clone)]
pub struct ScholarMcpServer {
    engine: Arc<ResearchEngine>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl ScholarMcpServer {

    pub fn new(engine: ResearchEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }


    fn convert_error(err: ScholarError) -> McpError {
        match err {
            ScholarError::Validation(msg) | ScholarError::Config(msg) => McpError::invalid_params(msg, None),
            other => McpError::internal_error(other.to_string(), None),
        }
    }


    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }
}

#[tool_router]
impl ScholarMcpServer {

    #[tool(description = "Answer a research question from indexed papers using hybrid keyword + semantic retrieval, graph enrichment and an LLM. Returns: {answer, confidence, sources, retrieval_diagnostics, error?}")]
    async fn query_papers(
        &self,
        Parameters(params): Parameters<QueryPapersParams>,
    ) -> Result<CallToolResult, McpError> {
        let question_preview: String = params.question.chars().take(50).collect();
        info!(
            "🔍 Query: '{}' [job={:?}, paper={:?}]",
            question_preview, params.job_id, params.paper_id
        );

        let response = self
            .engine
            .query(&params.question, params.job_id, params.paper_id)
            .await;

        if let Some(error) = &response.error {
            warn!("⚠️ Query failed: {}", error);
        } else {
            let confidence: &'static str = response.confidence.into();
            info!(
                "✅ {} confidence, {} sources, types={:?}",
                confidence,
                response.sources.len(),
                response.query_types
            );
        }

        let json = Self::result_to_json(&response)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Chunk a paper (abstract, contributions, sections) and replace its chunks in the keyword and semantic indexes. Returns: {paper_id, chunks_indexed}")]
    async fn index_paper(
        &self,
        Parameters(params): Parameters<IndexPaperParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("📥 Indexing paper {} ({} sections)", params.paper_id, params.sections.len());

        let chunks_indexed = self
            .engine
            .index_paper_sections(params.paper_id, &params.fields, &params.sections, params.job_id)
            .await
            .map_err(Self::convert_error)?;

        info!("✅ Indexed {} chunks", chunks_indexed);

        let json = Self::result_to_json(serde_json::json!({
            "paper_id": params.paper_id,
            "chunks_indexed": chunks_indexed,
        }))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Add a paper with its authors, concepts and citation links to the knowledge graph. Returns: {citation_links_created, authors, concepts, persisted}")]
    async fn add_to_graph(
        &self,
        Parameters(params): Parameters<AddToGraphParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "🕸️ Adding paper {} to graph ({} references)",
            params.paper_id,
            params.references.len()
        );

        let update = self
            .engine
            .add_to_graph(params.paper_id, &params.fields, &params.references, params.job_id)
            .await
            .map_err(Self::convert_error)?;

        if !update.persisted {
            warn!("⚠️ Graph update was not persisted");
        }

        let json = Self::result_to_json(&update)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Find papers related to a paper through citations, shared authors and shared concepts. Returns: [{paper_id, relationship, title, concept?, job_id}]")]
    async fn related_papers(
        &self,
        Parameters(params): Parameters<RelatedPapersParams>,
    ) -> Result<CallToolResult, McpError> {
        let max_results = params.max_results.unwrap_or(DEFAULT_RELATED_RESULTS);
        info!("🔗 Related papers for {} (max={})", params.paper_id, max_results);

        let related = self
            .engine
            .related_papers(params.paper_id, max_results, params.job_id);

        info!("✅ Found {} related papers", related.len());

        let json = Self::result_to_json(&related)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Summarize the knowledge graph: top concepts, most cited papers, key problems, innovations and gaps. Returns: {total_papers, total_concepts, top_concepts, influential_papers, ...}")]
    async fn research_overview(
        &self,
        Parameters(params): Parameters<ResearchOverviewParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("📊 Research overview [job={:?}]", params.job_id);

        let overview = self.engine.research_overview(params.job_id);

        let json = Self::result_to_json(&overview)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Have the LLM write a landscape summary (themes, methods, findings, challenges, directions) from the knowledge graph. Returns: {summary, total_papers, statistics, error?}")]
    async fn research_summary(
        &self,
        Parameters(params): Parameters<ResearchOverviewParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("📝 Research summary [job={:?}]", params.job_id);

        let summary = self.engine.research_summary(params.job_id).await;
        if let Some(error) = &summary.error {
            warn!("⚠️ Research summary incomplete: {}", error);
        }

        let json = Self::result_to_json(&summary)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "Keyword index, knowledge graph and cache statistics. Returns: {index, graph, cache?}")]
    async fn statistics(&self) -> Result<CallToolResult, McpError> {
        let stats = self.engine.statistics();

        let json = Self::result_to_json(&stats)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}


#[prompt_router]
impl ScholarMcpServer {

    #[prompt(
        name = "literature_review",
        description = "Generate prompt for a literature review of the indexed papers on a topic"
    )]
    async fn literature_review(
        &self,
        Parameters(args): Parameters<LiteratureReviewArgs>,
    ) -> Result<GetPromptResult, McpError> {
        let scope = args.job_id
            .map(|job| format!(" (job_id={})", job))
            .unwrap_or_default();

        let messages = vec![
            PromptMessage::new_text(
                PromptMessageRole::User,
                format!(
                    "Write a literature review on \"{}\"{}.

Use research_overview to see the main concepts and most cited papers.
Use query_papers for targeted questions and related_papers to follow citations.
Structure the review as:
1. Problem landscape
2. Main approaches and how they relate
3. Reported results
4. Open gaps
Cite every claim with the source numbers returned by query_papers.",
                    args.topic,
                    scope
                ),
            ),
        ];

        Ok(GetPromptResult {
            description: Some(format!("Literature review on {}", args.topic)),
            messages,
        })
    }
}


#[tool_handler]
#[prompt_handler]
impl ServerHandler for ScholarMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "scholar-rag".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Cited answers over a corpus of scientific papers. Use index_paper and add_to_graph \
                 to ingest, query_papers to ask questions, related_papers and research_overview to \
                 explore the citation and concept graph, research_summary for a written overview."
                    .to_string(),
            ),
        }
    }
}


pub async fn run_server() -> anyhow::Result<()> {
    info!("🚀 Initializing Scholar MCP Server...");

    let config = ScholarConfig::from_env();
    let engine = ResearchEngine::from_config(config)?;
    let stats = engine.initialize().await?;

    info!("✅ Scholar MCP Server ready");
    info!(
        "   🤖 LLM: {}/{}",
        engine.config().llm_provider,
        engine.config().llm_model
    );
    info!(
        "   📚 Keyword index: {} chunks, {} terms",
        stats.documents, stats.vocabulary
    );
    info!("   🕸️ Graph: {} papers", engine.graph().statistics().paper_nodes);

    let server = ScholarMcpServer::new(engine);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
