use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::errors::{CompletionError, EmbeddingError};

/// Any endpoint speaking the OpenAI REST dialect (Groq, LM Studio, OpenAI).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            name: "openai".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
            timeout: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// `POST /embeddings`; vectors are returned in input order.
    pub async fn embed(
        &self,
        inputs: &[String],
        model_id: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .post("/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(|err| EmbeddingError::Provider(err.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!(
                "{} embed error ({}): {}",
                self.name, status, text
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| EmbeddingError::Provider(err.to_string()))?;

        let mut data: Vec<&Value> = payload["data"]
            .as_array()
            .map(|items| items.iter().collect())
            .unwrap_or_default();
        data.sort_by_key(|item| item["index"].as_u64().unwrap_or(0));

        let embeddings: Vec<Vec<f32>> = data
            .into_iter()
            .filter_map(|item| item["embedding"].as_array())
            .map(|vals| {
                vals.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .collect();

        if embeddings.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, CompletionError> {
        if self.api_key.is_none() {
            return Err(CompletionError::MissingApiKey);
        }

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let res = self.post("/chat/completions").json(&body).send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body: text });
        }

        let payload: Value = res.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::llm::types::ChatMessage;

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("Where do snake plants grow?")])
            .with_temperature(0.7)
            .with_max_tokens(1000)
    }

    #[tokio::test]
    async fn chat_sends_model_and_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(json!({
                "model": "llama3-70b-8192",
                "temperature": 0.7,
                "max_tokens": 1000,
                "messages": [{ "role": "user", "content": "Where do snake plants grow?" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "# West Africa" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            OpenAiCompatibleProvider::new(Client::new(), server.uri(), Some("gsk-test".into()));
        let answer = provider.chat(request(), "llama3-70b-8192").await.unwrap();
        assert_eq!(answer, "# West Africa");
    }

    #[tokio::test]
    async fn chat_without_key_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(Client::new(), server.uri(), Some("  ".into()));
        let err = provider.chat(request(), "m").await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }

    #[tokio::test]
    async fn chat_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(Client::new(), server.uri(), Some("k".into()));
        match provider.chat(request(), "m").await {
            Err(CompletionError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn chat_missing_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(Client::new(), server.uri(), Some("k".into()));
        let err = provider.chat(request(), "m").await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn embed_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(Client::new(), server.uri(), None);
        let vectors = provider
            .embed(&["a".to_string(), "b".to_string()], "all-MiniLM-L6-v2")
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_count_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [1.0] }]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatibleProvider::new(Client::new(), server.uri(), None);
        let err = provider
            .embed(&["a".to_string(), "b".to_string()], "m")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::CountMismatch { expected: 2, actual: 1 }
        ));
    }
}
