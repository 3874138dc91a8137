pub mod extract;
pub mod fetch;
pub mod images;
pub mod plantnet;
pub mod search;

pub use extract::{extract_images, extract_links, extract_text, ElementFilter};
pub use fetch::{HttpScraper, PageFetcher};
pub use images::{DuckDuckGoImages, ImageResult, ImageSearchProvider, SafeSearch};
pub use plantnet::{PlantIdentification, PlantIdentifier, PlantNetClient};
pub use search::{DuckDuckGoSearch, SearchClient, SearchProvider, SearchResult};
