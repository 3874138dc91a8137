use std::sync::Arc;

use crate::core::config::settings::LlmSettings;
use crate::core::errors::CompletionError;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ChatMessage, ChatRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl From<&LlmSettings> for CompletionOptions {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Single-shot completion of a rendered prompt.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);

        tracing::debug!(
            "Requesting completion from {} ({}), prompt length {}",
            self.provider.name(),
            self.options.model,
            prompt.len()
        );
        self.provider.chat(request, &self.options.model).await
    }
}
