//! Search, scrape, index, retrieve, and generate for a single query.

use std::fmt;
use std::sync::Arc;

use scraper::Html;
use serde::Serialize;
use thiserror::Error;

use super::chunker::Chunker;
use super::session::VectorStoreSession;
use super::store::VectorStore;
use super::types::ScrapedDocument;
use crate::core::config::Settings;
use crate::core::errors::{CompletionError, IndexError};
use crate::embedding::Embedder;
use crate::llm::LlmService;
use crate::rag::prompt::build_prompt;
use crate::tools::extract::{extract_text, ElementFilter};
use crate::tools::fetch::PageFetcher;
use crate::tools::search::{SearchClient, DEFAULT_MAX_RESULTS};

pub const NO_RESULTS_ANSWER: &str = "No relevant information found.";
pub const INTERNAL_ERROR_ANSWER: &str = "Unable to generate response due to an internal error.";
pub const MAX_DOCUMENTS: usize = 70;
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Searching,
    Scraping,
    Chunking,
    Indexing,
    Retrieving,
    Prompting,
    Generating,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Searching => "searching",
            Stage::Scraping => "scraping",
            Stage::Chunking => "chunking",
            Stage::Indexing => "indexing",
            Stage::Retrieving => "retrieving",
            Stage::Prompting => "prompting",
            Stage::Generating => "generating",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Scraped { url: String, paragraphs: usize },
    Failed { url: String, reason: String },
}

impl ScrapeOutcome {
    pub fn url(&self) -> &str {
        match self {
            ScrapeOutcome::Scraped { url, .. } | ScrapeOutcome::Failed { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Scraped { .. })
    }
}

/// What a pipeline run did, alongside the answer text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub answer: String,
    /// `Done` or `Failed`.
    pub stage: Stage,
    /// Stage that raised the error, when `stage` is `Failed`.
    pub failed_at: Option<Stage>,
    pub scrape_outcomes: Vec<ScrapeOutcome>,
    pub chunk_count: usize,
    pub retrieved: usize,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            answer: String::new(),
            stage: Stage::Idle,
            failed_at: None,
            scrape_outcomes: Vec::new(),
            chunk_count: 0,
            retrieved: 0,
        }
    }
}

#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_results: usize,
    pub max_documents: usize,
    pub top_k: usize,
    pub filter: ElementFilter,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            max_documents: MAX_DOCUMENTS,
            top_k: DEFAULT_TOP_K,
            filter: ElementFilter::paragraphs(),
        }
    }
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        let mut filter = ElementFilter::new(settings.scraper.element.clone());
        filter.class_name = settings.scraper.class_name.clone();
        filter.id_name = settings.scraper.id_name.clone();
        Self {
            max_results: settings.search.max_results,
            max_documents: settings.rag.max_documents,
            top_k: settings.rag.top_k,
            filter,
        }
    }
}

pub struct RagPipeline {
    search: SearchClient,
    fetcher: Arc<dyn PageFetcher>,
    chunker: Chunker,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    llm: LlmService,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(
        search: SearchClient,
        fetcher: Arc<dyn PageFetcher>,
        chunker: Chunker,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        llm: LlmService,
        options: PipelineOptions,
    ) -> Self {
        Self {
            search,
            fetcher,
            chunker,
            store,
            embedder,
            llm,
            options,
        }
    }

    pub async fn answer(&self, query: &str) -> String {
        self.run(query).await.answer
    }

    /// Runs every stage for `query`. Never fails: errors become the generic
    /// answer, and the request's index entries are always removed.
    pub async fn run(&self, query: &str) -> PipelineReport {
        let mut report = PipelineReport::new();
        let session = VectorStoreSession::open(self.store.clone(), self.embedder.clone());
        tracing::info!("Answering query in {}", session.id());

        let result = self.execute(query, &session, &mut report).await;

        let reached = report.stage;
        report.stage = Stage::Cleanup;
        if let Err(err) = session.cleanup().await {
            tracing::error!("Failed to clean up {}: {}", session.id(), err);
        }

        match result {
            Ok(answer) => {
                report.answer = answer;
                report.stage = Stage::Done;
            }
            Err(err) => {
                tracing::error!("Pipeline failed while {}: {}", reached, err);
                report.answer = INTERNAL_ERROR_ANSWER.to_string();
                report.failed_at = Some(reached);
                report.stage = Stage::Failed;
            }
        }
        report
    }

    async fn execute(
        &self,
        query: &str,
        session: &VectorStoreSession,
        report: &mut PipelineReport,
    ) -> Result<String, PipelineError> {
        report.stage = Stage::Searching;
        let urls = self.search.links(query, self.options.max_results).await;
        if urls.is_empty() {
            tracing::info!("No search results for query");
            return Ok(NO_RESULTS_ANSWER.to_string());
        }

        report.stage = Stage::Scraping;
        let mut documents = Vec::new();
        for url in urls {
            match self.fetcher.fetch_page(&url).await {
                Ok(body) => {
                    let paragraphs = {
                        let doc = Html::parse_document(&body);
                        extract_text(&doc, &self.options.filter)
                    };
                    report.scrape_outcomes.push(ScrapeOutcome::Scraped {
                        url: url.clone(),
                        paragraphs: paragraphs.len(),
                    });
                    documents.push(ScrapedDocument {
                        content: paragraphs.join(" "),
                        source: url,
                    });
                }
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", url, err);
                    report.scrape_outcomes.push(ScrapeOutcome::Failed {
                        url,
                        reason: err.to_string(),
                    });
                }
            }
        }

        report.stage = Stage::Chunking;
        let mut chunks = self.chunker.chunk_documents(&documents);
        if chunks.len() > self.options.max_documents {
            tracing::info!(
                "Truncating {} chunks to {}",
                chunks.len(),
                self.options.max_documents
            );
            chunks.truncate(self.options.max_documents);
        }
        report.chunk_count = chunks.len();

        report.stage = Stage::Indexing;
        session.add(chunks).await?;

        report.stage = Stage::Retrieving;
        let nearest = session.query(query, self.options.top_k).await?;
        report.retrieved = nearest.len();

        report.stage = Stage::Prompting;
        let context: Vec<String> = nearest.into_iter().map(|entry| entry.chunk.text).collect();
        let prompt = build_prompt(query, &context);

        report.stage = Stage::Generating;
        Ok(self.llm.complete(&prompt).await?)
    }
}
