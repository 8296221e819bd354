//! Corpus file parsing: turns raw file bytes into documents

use crate::error::{Error, Result};
use crate::types::{Document, FileType};

/// Result of parsing one file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Detected file type
    pub file_type: FileType,
    /// Non-empty records in file order
    pub documents: Vec<Document>,
}

/// Reader for the supported corpus formats
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension.
    ///
    /// `source` is the path relative to the corpus root and feeds document ids.
    pub fn parse(source: &str, data: &[u8]) -> Result<ParsedFile> {
        let file_type = FileType::from_path(source);

        let documents = match file_type {
            FileType::Txt | FileType::Markdown => Self::parse_text(source, data),
            FileType::Csv => Self::parse_csv(source, data)?,
            FileType::Unknown => {
                return Err(Error::UnsupportedFileType(source.to_string()));
            }
        };

        Ok(ParsedFile {
            file_type,
            documents,
        })
    }

    /// Plain text and markdown: one document per blank-line separated paragraph
    fn parse_text(source: &str, data: &[u8]) -> Vec<Document> {
        let content = String::from_utf8_lossy(data).replace("\r\n", "\n");

        let mut documents = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();

        for line in content.lines().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !paragraph.is_empty() {
                    let text = paragraph.join("\n").trim().to_string();
                    documents.push(Document::new(source, documents.len(), text));
                    paragraph.clear();
                }
            } else {
                paragraph.push(line);
            }
        }

        documents
    }

    /// CSV: header row consumed, one document per data row with fields joined by ", "
    fn parse_csv(source: &str, data: &[u8]) -> Result<Vec<Document>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        reader
            .headers()
            .map_err(|e| Error::file_parse(source, format!("Invalid CSV header: {}", e)))?;

        let mut documents = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping unreadable CSV row {} in {}: {}", row + 1, source, e);
                    continue;
                }
            };

            let text = record
                .iter()
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .collect::<Vec<_>>()
                .join(", ");

            if !text.is_empty() {
                documents.push(Document::new(source, documents.len(), text));
            }
        }

        Ok(documents)
    }
}
