//! Web-search-augmented question answering service.

pub mod core;
pub mod embedding;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;
