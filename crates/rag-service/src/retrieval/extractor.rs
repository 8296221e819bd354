//! Query metadata extraction through the generative model

use serde_json::Value;
use std::sync::Arc;

use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::QueryFilter;

/// Structures a free-text question into a [`QueryFilter`].
///
/// Extraction is advisory: every failure yields an empty filter.
pub struct MetadataExtractor {
    llm: Arc<dyn LlmProvider>,
}

impl MetadataExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Extract a filter from `question`; never fails
    pub async fn extract(&self, question: &str) -> QueryFilter {
        let prompt = PromptBuilder::build_extraction_prompt(question);

        let output = match self.llm.complete(&prompt).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Metadata extraction failed, continuing unfiltered: {}", e);
                return QueryFilter::default();
            }
        };

        let filter = parse_filter(&output);
        tracing::debug!("Extracted filter: {:?}", filter);
        filter
    }
}

/// Parse the last non-empty, non-fence line of model output as a filter object
pub fn parse_filter(output: &str) -> QueryFilter {
    let Some(line) = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .last()
    else {
        tracing::warn!("Metadata extraction returned no output");
        return QueryFilter::default();
    };

    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Metadata extraction output is not JSON ({}): {}", e, line);
            return QueryFilter::default();
        }
    };

    let Some(object) = value.as_object() else {
        tracing::warn!("Metadata extraction output is not a JSON object: {}", line);
        return QueryFilter::default();
    };

    let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
    QueryFilter::new(field("entity"), field("period"), field("project"))
}
