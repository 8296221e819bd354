//! rag-service: retrieval-augmented question answering over allocation records
//!
//! Documents are read from a corpus directory (or uploaded), sentences of the form
//! `<entity> at <period> allocated <breakdown>` are parsed into structured metadata,
//! and questions are answered by a hybrid retriever that tries a metadata-filtered
//! lookup before falling back to similarity search. Answers stream back from the
//! generative model as plain text or Server-Sent Events.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{AnswerGenerator, StreamMode};
pub use ingestion::{AllocationParser, IngestPipeline};
pub use retrieval::{HybridRetriever, MetadataExtractor};
pub use server::{build_router, state::AppState, RagServer};
pub use types::{
    AllocationRecord, Document, DocumentMetadata, QueryFilter, Retrieval, RetrievalPath,
    RetrievalResult,
};
