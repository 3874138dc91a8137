//! DuckDuckGo image search.
//!
//! Two requests: the landing page yields a `vqd` token, which `i.js` then
//! requires alongside the query.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::SearchError;

pub const DEFAULT_IMAGE_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub title: String,
    pub image: String,
    pub thumbnail: String,
    pub url: String,
    pub height: u64,
    pub width: u64,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeSearch {
    On,
    #[default]
    Moderate,
    Off,
}

impl SafeSearch {
    fn as_param(self) -> &'static str {
        match self {
            SafeSearch::On | SafeSearch::Moderate => "1",
            SafeSearch::Off => "-1",
        }
    }
}

#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    async fn images(
        &self,
        query: &str,
        max_results: usize,
        safesearch: SafeSearch,
    ) -> Result<Vec<ImageResult>, SearchError>;
}

#[derive(Clone)]
pub struct DuckDuckGoImages {
    client: Client,
    base_url: String,
}

impl DuckDuckGoImages {
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn vqd_token(&self, query: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        extract_vqd(&body).ok_or(SearchError::MissingToken)
    }
}

#[async_trait]
impl ImageSearchProvider for DuckDuckGoImages {
    async fn images(
        &self,
        query: &str,
        max_results: usize,
        safesearch: SafeSearch,
    ) -> Result<Vec<ImageResult>, SearchError> {
        let vqd = self.vqd_token(query).await?;
        tracing::debug!("Image search for '{}' with vqd {}", query, vqd);

        let response = self
            .client
            .get(format!("{}/i.js", self.base_url))
            .header("Referer", format!("{}/", self.base_url))
            .query(&[
                ("l", "wt-wt"),
                ("o", "json"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("f", ",,,,,"),
                ("p", safesearch.as_param()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let payload: Value = response.json().await?;
        let mut results = parse_image_results(&payload)?;
        results.truncate(max_results);
        Ok(results)
    }
}

fn extract_vqd(body: &str) -> Option<String> {
    let pattern = Regex::new(r#"vqd=["']?([\d-]+)"#).ok()?;
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_image_results(payload: &Value) -> Result<Vec<ImageResult>, SearchError> {
    let items = payload
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Malformed("missing 'results' array".to_string()))?;

    let text = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let number = |item: &Value, key: &str| item.get(key).and_then(Value::as_u64).unwrap_or(0);

    Ok(items
        .iter()
        .filter(|item| item.get("image").and_then(Value::as_str).is_some())
        .map(|item| ImageResult {
            title: text(item, "title"),
            image: text(item, "image"),
            thumbnail: text(item, "thumbnail"),
            url: text(item, "url"),
            height: number(item, "height"),
            width: number(item, "width"),
            source: text(item, "source"),
        })
        .collect())
}
