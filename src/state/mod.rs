use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::core::config::{AppPaths, ConfigService, Settings, StoreBackend};
use crate::embedding::build_embedder;
use crate::llm::{CompletionOptions, LlmService, OpenAiCompatibleProvider};
use crate::rag::{
    Chunker, InMemoryVectorStore, PipelineOptions, RagPipeline, SqliteVectorStore, VectorStore,
};
use crate::tools::{
    DuckDuckGoImages, DuckDuckGoSearch, HttpScraper, ImageSearchProvider, PlantIdentifier,
    PlantNetClient, SearchClient,
};

pub mod error;

use error::InitializationError;

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub pipeline: Arc<RagPipeline>,
    pub images: Arc<dyn ImageSearchProvider>,
    pub plant: Arc<dyn PlantIdentifier>,
}

impl AppState {
    /// Loads settings and wires the pipeline's collaborators.
    ///
    /// The vector store is reset once here; afterwards each request removes
    /// only its own entries.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::debug!(
            "Effective config: {}",
            config.redact_sensitive_values(&serde_json::to_value(&settings).unwrap_or_default())
        );

        let client = Client::builder()
            .build()
            .map_err(|e| InitializationError::Http(e.into()))?;

        let store: Arc<dyn VectorStore> = match settings.rag.store {
            StoreBackend::Memory => Arc::new(InMemoryVectorStore::new()),
            StoreBackend::Sqlite => {
                let store = match settings.rag.sqlite_path.clone() {
                    Some(db_path) => SqliteVectorStore::with_path(db_path).await,
                    None => SqliteVectorStore::new(&paths).await,
                };
                Arc::new(store.map_err(|e| InitializationError::Store(e.into()))?)
            }
        };
        store
            .reset()
            .await
            .map_err(|e| InitializationError::Store(e.into()))?;

        let embedding_settings = settings.embedding.clone();
        let embedding_client = client.clone();
        let cache_dir = paths.model_cache_dir.clone();
        let embedder = tokio::task::spawn_blocking(move || {
            build_embedder(&embedding_settings, embedding_client, &cache_dir)
        })
        .await
        .map_err(|e| InitializationError::Embedding(e.into()))?
        .map_err(|e| InitializationError::Embedding(e.into()))?;

        let chunker = Chunker::new(settings.rag.chunk_size, settings.rag.chunk_overlap)
            .map_err(|e| InitializationError::Chunker(e.into()))?;

        let scraper = HttpScraper::new(client.clone())
            .with_timeout(Duration::from_secs(settings.scraper.timeout_secs))
            .with_user_agent(&settings.scraper.user_agent);

        let search = SearchClient::new(Arc::new(DuckDuckGoSearch::with_base_url(
            client.clone(),
            &settings.search.text_endpoint,
        )));

        let mut provider = OpenAiCompatibleProvider::new(
            client.clone(),
            &settings.llm.base_url,
            settings.llm.api_key.clone(),
        )
        .with_name("llm");
        if let Some(secs) = settings.llm.timeout_secs {
            provider = provider.with_timeout(Duration::from_secs(secs));
        }
        let llm = LlmService::new(Arc::new(provider), CompletionOptions::from(&settings.llm));
        tracing::info!("Using completion model {}", llm.options().model);

        let pipeline = Arc::new(RagPipeline::new(
            search,
            Arc::new(scraper),
            chunker,
            store,
            embedder,
            llm,
            PipelineOptions::from(&settings),
        ));

        let images = Arc::new(DuckDuckGoImages::with_base_url(
            client.clone(),
            &settings.search.image_endpoint,
        ));
        let plant = Arc::new(PlantNetClient::new(
            client,
            &settings.plant.api_url,
            settings.plant.api_key.clone(),
        ));

        if settings.llm.api_key.is_none() {
            tracing::warn!("GROQ_API_KEY is not set; /textlinks will answer with an error message");
        }
        if settings.plant.api_key.is_none() {
            tracing::warn!("PLANTNET_API_KEY is not set; /identify-plant will fail");
        }

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            pipeline,
            images,
            plant,
        }))
    }
}
