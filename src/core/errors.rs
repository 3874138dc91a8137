use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream error: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failure to download a single page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {url}: status code {status}")]
    Status { url: String, status: u16 },
    #[error("empty response from {url}")]
    EmptyBody { url: String },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("search provider returned status {0}")]
    Status(u16),
    #[error("search token not found in provider response")]
    MissingToken,
    #[error("malformed search response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("unsupported embedding model: {0}")]
    UnsupportedModel(String),
    #[error("embedding model failed: {0}")]
    Model(String),
    #[error("embedding provider failed: {0}")]
    Provider(String),
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("embedding task aborted: {0}")]
    Task(String),
}

/// Vector index and storage failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("vector dimension mismatch: query has {query}, entry has {entry}")]
    DimensionMismatch { query: usize, entry: usize },
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for IndexError {
    fn from(err: sqlx::Error) -> Self {
        IndexError::Storage(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("LLM API key is not configured")]
    MissingApiKey,
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response contained no message content")]
    EmptyResponse,
}

/// Failures talking to the plant recognition service.
#[derive(Debug, Error)]
pub enum ExternalApiError {
    #[error("PlantNet API key is not configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("unexpected provider response: {0}")]
    Decode(String),
}
