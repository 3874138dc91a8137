use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[source] anyhow::Error),

    #[error("Failed to initialize vector store: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to initialize embedding model: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Invalid chunking configuration: {0}")]
    Chunker(#[source] anyhow::Error),
}
