use serde::{Deserialize, Serialize};

/// Extracted text of one successfully scraped page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDocument {
    pub content: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}
