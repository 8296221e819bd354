//! Core types for the RAG service

pub mod document;
pub mod metadata;
pub mod query;
pub mod response;

pub use document::{Document, FileType};
pub use metadata::{AllocationRecord, DocumentMetadata, QueryFilter};
pub use query::{ChatRequest, SearchParams};
pub use response::{IngestReport, IngestResponse, Retrieval, RetrievalHit, RetrievalPath, RetrievalResult};
