use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::core::errors::SearchError;

pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 20;
pub const DEFAULT_MAX_RESULTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub snippet: String,
}

/// A web search backend returning up to `max_results` hits.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

pub fn clamp_max_results(max_results: usize) -> usize {
    max_results.clamp(MIN_RESULTS, MAX_RESULTS)
}

/// Bounded, failure-tolerant front over a [`SearchProvider`].
#[derive(Clone)]
pub struct SearchClient {
    provider: Arc<dyn SearchProvider>,
}

impl SearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Never fails: provider errors are logged and produce no results.
    pub async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let max_results = clamp_max_results(max_results);
        match self.provider.text(query, max_results).await {
            Ok(mut results) => {
                results.truncate(max_results);
                results
            }
            Err(err) => {
                tracing::error!("Search failed for '{}': {}", query, err);
                Vec::new()
            }
        }
    }

    /// Result URLs only, in rank order.
    pub async fn links(&self, query: &str, max_results: usize) -> Vec<String> {
        self.search(query, max_results)
            .await
            .into_iter()
            .map(|result| result.href)
            .filter(|href| !href.is_empty())
            .collect()
    }
}

/// Scrapes the DuckDuckGo HTML results page.
#[derive(Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn text(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(format!("{}/html/", self.base_url))
            // kp=-1 is moderate safe search
            .form(&[("q", query), ("kp", "-1")])
            .header("Accept", "text/html")
            .send()
            .await?;

        // 202 with an empty page is how DuckDuckGo throttles
        let status = response.status();
        if !status.is_success() || status == StatusCode::ACCEPTED {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(parse_results(&body, max_results))
    }
}

/// Extracts `{title, href, snippet}` from a DuckDuckGo HTML results page.
pub fn parse_results(body: &str, max_results: usize) -> Vec<SearchResult> {
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse("a.result__snippet, .result__snippet"),
    ) else {
        return Vec::new();
    };

    let doc = Html::parse_document(body);
    let mut results = Vec::new();
    for result in doc.select(&result_sel) {
        if results.len() >= max_results {
            break;
        }

        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let title = link.text().collect::<String>().trim().to_string();
        let href = decode_redirect(link.value().attr("href").unwrap_or(""));
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        if title.is_empty() || !href.starts_with("http") {
            continue;
        }
        results.push(SearchResult {
            title,
            href,
            snippet,
        });
    }
    results
}

/// Unwraps `//duckduckgo.com/l/?uddg=<encoded>&rut=...` redirect links.
fn decode_redirect(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + "uddg=".len();
        let end = href[start..]
            .find('&')
            .map(|i| start + i)
            .unwrap_or(href.len());
        let encoded = &href[start..end];
        if !encoded.is_empty() {
            return urlencoding::decode(encoded)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| encoded.to_string());
        }
    }
    href.to_string()
}
