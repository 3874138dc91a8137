//! PlantNet species identification.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::ExternalApiError;

pub const PLANTNET_API_URL: &str = "https://my-api.plantnet.org/v2/identify/all";
pub const DEFAULT_ORGAN: &str = "leaf";

/// Best match reshaped for clients. `confidence` is the provider's raw score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantIdentification {
    pub species: String,
    pub common_names: Vec<String>,
    pub family: String,
    pub genus: String,
    pub confidence: f64,
    pub images: Vec<Value>,
    pub organ: String,
}

#[async_trait]
pub trait PlantIdentifier: Send + Sync {
    /// `Ok(None)` when the provider found no match.
    async fn identify(
        &self,
        image: &[u8],
        organ: &str,
    ) -> Result<Option<PlantIdentification>, ExternalApiError>;
}

#[derive(Clone)]
pub struct PlantNetClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl PlantNetClient {
    pub fn new(client: Client, api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl PlantIdentifier for PlantNetClient {
    async fn identify(
        &self,
        image: &[u8],
        organ: &str,
    ) -> Result<Option<PlantIdentification>, ExternalApiError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ExternalApiError::MissingApiKey)?;

        let body = json!({
            "images": [STANDARD.encode(image)],
            "organs": [organ],
        });

        let response = self
            .client
            .post(&self.api_url)
            .query(&[("api-key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        // PlantNet answers 404 "Species not found" for unrecognised images.
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ExternalApiError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await?;
        best_match(&payload, organ)
    }
}

fn best_match(payload: &Value, organ: &str) -> Result<Option<PlantIdentification>, ExternalApiError> {
    let Some(best) = payload
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Ok(None);
    };

    let species = best
        .get("species")
        .ok_or_else(|| ExternalApiError::Decode("missing 'species'".to_string()))?;
    let scientific_name = |value: Option<&Value>, field: &str| {
        value
            .and_then(|v| v.get("scientificNameWithoutAuthor"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ExternalApiError::Decode(format!("missing '{}' name", field)))
    };

    let common_names = species
        .get("commonNames")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let images = best
        .get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| image.get("url").cloned())
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(PlantIdentification {
        species: scientific_name(Some(species), "species")?,
        common_names,
        family: scientific_name(species.get("family"), "family")?,
        genus: scientific_name(species.get("genus"), "genus")?,
        confidence: best
            .get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| ExternalApiError::Decode("missing 'score'".to_string()))?,
        images,
        organ: organ.to_string(),
    }))
}
