//! Query-time retrieval

pub mod extractor;
pub mod search;

pub use extractor::MetadataExtractor;
pub use search::HybridRetriever;
