pub mod openai;
pub mod provider;
pub mod service;
pub mod types;

pub use openai::OpenAiCompatibleProvider;
pub use provider::LlmProvider;
pub use service::{CompletionOptions, LlmService};
pub use types::{ChatMessage, ChatRequest};
