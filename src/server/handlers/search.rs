use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::tools::images::SafeSearch;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

fn validate_message(message: &str, max_len: usize) -> Result<&str, ApiError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    if message.chars().count() > max_len {
        return Err(ApiError::BadRequest(format!(
            "message exceeds {} characters",
            max_len
        )));
    }
    Ok(message)
}

/// `POST /textlinks`: answers the message from freshly searched web pages.
pub async fn text_links(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate_message(&request.message, state.settings.server.max_message_length)?;
    let report = state.pipeline.run(query).await;
    let skipped: Vec<&str> = report
        .scrape_outcomes
        .iter()
        .filter(|outcome| !outcome.is_success())
        .map(|outcome| outcome.url())
        .collect();
    if !skipped.is_empty() {
        tracing::debug!("Sources without content: {:?}", skipped);
    }
    tracing::info!(
        "Answered query: stage={}, scraped={}/{}, chunks={}",
        report.stage,
        report
            .scrape_outcomes
            .iter()
            .filter(|outcome| outcome.is_success())
            .count(),
        report.scrape_outcomes.len(),
        report.chunk_count
    );
    Ok(Json(QueryResponse {
        response: report.answer,
    }))
}

/// `POST /imagelinks`: image search results for the message.
pub async fn image_links(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate_message(&request.message, state.settings.server.max_message_length)?;
    let results = state
        .images
        .images(
            query,
            state.settings.search.image_max_results,
            SafeSearch::Moderate,
        )
        .await
        .map_err(|err| {
            tracing::error!("Image search failed: {}", err);
            ApiError::BadGateway(format!("Image search failed: {}", err))
        })?;
    Ok(Json(results))
}
