use async_trait::async_trait;
use reqwest::Client;

use super::Embedder;
use crate::core::errors::EmbeddingError;
use crate::llm::OpenAiCompatibleProvider;

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteEmbedder {
    provider: OpenAiCompatibleProvider,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: OpenAiCompatibleProvider::new(client, base_url, api_key)
                .with_name("embeddings"),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.provider.embed(&texts, &self.model).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn embeds_through_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({ "model": "all-MiniLM-L6-v2", "input": ["snake"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [0.25, 0.5] }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = RemoteEmbedder::new(Client::new(), server.uri(), None, "all-MiniLM-L6-v2");
        assert_eq!(embedder.embed_one("snake").await.unwrap(), vec![0.25, 0.5]);
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        let embedder = RemoteEmbedder::new(Client::new(), "http://127.0.0.1:1", None, "m");
        assert!(embedder.embed(Vec::new()).await.unwrap().is_empty());
    }
}
