//! Retrieval-augmented answering over freshly scraped web pages.
//!
//! Pages are split by [`Chunker`], indexed per request through a
//! [`VectorStoreSession`], and the nearest chunks are rendered into the
//! completion prompt by [`RagPipeline`].

pub mod chunker;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod sqlite;
pub mod store;
pub mod types;

pub use chunker::Chunker;
pub use memory::InMemoryVectorStore;
pub use pipeline::{PipelineOptions, PipelineReport, RagPipeline, ScrapeOutcome, Stage};
pub use session::VectorStoreSession;
pub use sqlite::SqliteVectorStore;
pub use store::{IndexedEntry, ScoredEntry, VectorStore};
pub use types::{Chunk, ScrapedDocument};
