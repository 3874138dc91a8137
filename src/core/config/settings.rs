//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty config file yields a working
//! service; API keys come from the secrets file or the environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub search: SearchSettings,
    pub scraper: ScraperSettings,
    pub rag: RagSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub plant: PlantSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_message_length: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://192.168.29.125:3000".to_string(),
                "http://localhost:3000".to_string(),
                "https://logi-search-client-be3i8coa8-ryan-fernandes-projects.vercel.app"
                    .to_string(),
                "https://logi-search-client.vercel.app".to_string(),
            ],
            max_message_length: 2_000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub max_results: usize,
    pub image_max_results: usize,
    pub text_endpoint: String,
    pub image_endpoint: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 4,
            image_max_results: 5,
            text_endpoint: "https://html.duckduckgo.com".to_string(),
            image_endpoint: "https://duckduckgo.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Element type text is pulled from, `p` unless overridden.
    pub element: String,
    pub class_name: Option<String>,
    pub id_name: Option<String>,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            element: "p".to_string(),
            class_name: None,
            id_name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_documents: usize,
    pub top_k: usize,
    pub store: StoreBackend,
    /// Database file for the sqlite backend; defaults to `<data_dir>/index.db`.
    pub sqlite_path: Option<PathBuf>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
            max_documents: 70,
            top_k: 3,
            store: StoreBackend::Memory,
            sqlite_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Fastembed,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub model: String,
    /// OpenAI-compatible base URL used by the remote provider.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Fastembed,
            model: "all-MiniLM-L6-v2".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            api_key: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantSettings {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for PlantSettings {
    fn default() -> Self {
        Self {
            api_url: "https://my-api.plantnet.org/v2/identify/all".to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Applies environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(key) = non_empty("PLANTNET_API_KEY") {
            self.plant.api_key = Some(key);
        }
        if let Some(key) = non_empty("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(port) = non_empty("PORT").and_then(|value| value.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
    }
}
