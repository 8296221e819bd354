//! Raw documents as read from the corpus

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Supported corpus file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// CSV file
    Csv,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path or file name
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Csv => "CSV",
            Self::Unknown => "Unknown",
        }
    }
}

/// One ingestible record: immutable text plus a stable identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier derived from source, position and text
    pub id: String,
    /// Raw text
    pub text: String,
    /// Source path relative to the corpus root
    pub source: String,
    /// Position of this record within its source file
    pub record_index: usize,
}

impl Document {
    /// Create a document, deriving its identifier
    pub fn new(source: impl Into<String>, record_index: usize, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        let id = document_id(&source, record_index, &text);
        Self {
            id,
            text,
            source,
            record_index,
        }
    }

    /// Whether the text has any non-whitespace content
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Derive a stable 32-hex-char identifier for a record
pub fn document_id(source: &str, record_index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(record_index.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}
