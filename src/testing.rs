//! In-process fakes for the service's external collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::{
    CompletionError, EmbeddingError, ExternalApiError, FetchError, SearchError,
};
use crate::embedding::Embedder;
use crate::llm::{ChatRequest, LlmProvider};
use crate::tools::images::{ImageResult, ImageSearchProvider, SafeSearch};
use crate::tools::plantnet::{PlantIdentification, PlantIdentifier};
use crate::tools::{PageFetcher, SearchProvider, SearchResult};

const VOCABULARY: [&str; 9] = [
    "snake", "plant", "grow", "africa", "water", "garden", "desert", "light", "soil",
];

/// Embeds text as keyword occurrence counts over a small fixed vocabulary.
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Model("model unavailable".to_string()))
    }
}

/// Returns a fixed list of result URLs.
#[derive(Default)]
pub struct StubSearch {
    hrefs: Vec<String>,
    calls: AtomicUsize,
}

impl StubSearch {
    pub fn with_links(hrefs: &[&str]) -> Self {
        Self {
            hrefs: hrefs.iter().map(|href| href.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn text(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .hrefs
            .iter()
            .take(max_results)
            .map(|href| SearchResult {
                title: href.clone(),
                href: href.clone(),
                snippet: String::new(),
            })
            .collect())
    }
}

/// Serves canned HTML per URL; unknown URLs answer 404.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// Records prompts and answers with a fixed reply, or fails when built with
/// [`StubLlm::failing`].
pub struct StubLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<String, CompletionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.extend(request.messages.into_iter().map(|m| m.content));
        }
        self.reply.clone().ok_or(CompletionError::Status {
            status: 500,
            body: "upstream failure".to_string(),
        })
    }
}

/// Returns `count` generated image results.
pub struct StubImages {
    pub count: usize,
    pub fail: bool,
}

#[async_trait]
impl ImageSearchProvider for StubImages {
    async fn images(
        &self,
        query: &str,
        max_results: usize,
        _safesearch: SafeSearch,
    ) -> Result<Vec<ImageResult>, SearchError> {
        if self.fail {
            return Err(SearchError::Status(403));
        }
        Ok((0..self.count.min(max_results))
            .map(|i| ImageResult {
                title: format!("{} {}", query, i),
                image: format!("https://img.example.com/{}.jpg", i),
                thumbnail: format!("https://tse.example.com/{}.jpg", i),
                url: format!("https://example.com/{}", i),
                height: 600,
                width: 800,
                source: "Bing".to_string(),
            })
            .collect())
    }
}

pub enum StubPlantOutcome {
    Match(PlantIdentification),
    NoMatch,
    Fail,
}

pub struct StubPlant {
    outcome: StubPlantOutcome,
    seen: Mutex<Vec<(usize, String)>>,
}

impl StubPlant {
    pub fn new(outcome: StubPlantOutcome) -> Self {
        Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(image byte length, organ)` per call.
    pub fn seen(&self) -> Vec<(usize, String)> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PlantIdentifier for StubPlant {
    async fn identify(
        &self,
        image: &[u8],
        organ: &str,
    ) -> Result<Option<PlantIdentification>, ExternalApiError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((image.len(), organ.to_string()));
        }
        match &self.outcome {
            StubPlantOutcome::Match(identification) => Ok(Some(PlantIdentification {
                organ: organ.to_string(),
                ..identification.clone()
            })),
            StubPlantOutcome::NoMatch => Ok(None),
            StubPlantOutcome::Fail => Err(ExternalApiError::Status(500)),
        }
    }
}
