use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::tools::plantnet::DEFAULT_ORGAN;

pub const NO_MATCH_MESSAGE: &str = "No plant matches found";

/// `POST /identify-plant`: multipart `file` plus optional `organ`.
///
/// Provider outcomes, including failures, are reported in the body as
/// `{"error": ...}` with status 200; only malformed uploads are rejected.
pub async fn identify_plant(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut image: Option<Vec<u8>> = None;
    let mut organ = DEFAULT_ORGAN.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart body: {}", err)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::BadRequest(format!("Invalid file field: {}", err)))?;
                image = Some(bytes.to_vec());
            }
            Some("organ") => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ApiError::BadRequest(format!("Invalid organ field: {}", err)))?;
                if !value.trim().is_empty() {
                    organ = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let response = match state.plant.identify(&image, &organ).await {
        Ok(Some(identification)) => Json(identification).into_response(),
        Ok(None) => Json(json!({ "error": NO_MATCH_MESSAGE })).into_response(),
        Err(err) => {
            tracing::error!("Plant identification error: {}", err);
            Json(json!({ "error": format!("Failed to identify plant: {}", err) })).into_response()
        }
    };
    Ok(response)
}
