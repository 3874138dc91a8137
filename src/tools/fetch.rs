//! Page fetching for the scraping stage.
//!
//! One attempt per URL, browser-like User-Agent, TLS verification left on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use scraper::Html;

use crate::core::config::settings::DEFAULT_USER_AGENT;
use crate::core::errors::FetchError;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Downloads raw HTML for a URL.
///
/// Returns the body as a `String` rather than a parsed tree because
/// `scraper::Html` is `!Send` and cannot be held across an await point.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct HttpScraper {
    client: Client,
    headers: HeaderMap,
    timeout: Duration,
}

impl HttpScraper {
    pub fn new(client: Client) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        Self {
            client,
            headers,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        match HeaderValue::from_str(user_agent) {
            Ok(value) => {
                self.headers.insert(USER_AGENT, value);
            }
            Err(err) => tracing::warn!("Ignoring invalid user agent {:?}: {}", user_agent, err),
        }
        self
    }

    /// Fetches `url` and parses it into a document tree.
    pub async fn fetch_document(&self, url: &str) -> Result<Html, FetchError> {
        let body = self.fetch_page(url).await?;
        Ok(Html::parse_document(&body))
    }
}

#[async_trait]
impl PageFetcher for HttpScraper {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| {
                tracing::error!("Request failed for {}: {}", url, source);
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
