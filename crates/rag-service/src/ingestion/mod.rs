//! Document ingestion: corpus reading, allocation parsing and store writes

pub mod allocation;
mod parser;
mod processor;

pub use allocation::{AllocationParser, ParsedAllocation};
pub use parser::{FileParser, ParsedFile};
pub use processor::IngestPipeline;
