//! Prompt templates and context assembly

use crate::types::{Retrieval, RetrievalHit, RetrievalPath};

/// Prompt builder for extraction and answer generation
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render retrieved passages for the answer prompt.
    ///
    /// Filtered hits are rendered as structured blocks because their metadata was
    /// checked against the query; semantic hits are rendered as raw text only.
    pub fn build_context(retrieval: &Retrieval) -> String {
        let blocks: Vec<String> = match retrieval.path {
            RetrievalPath::Filtered => retrieval.result.iter().map(Self::structured_block).collect(),
            RetrievalPath::Semantic => retrieval
                .result
                .iter()
                .map(|hit| hit.document.clone())
                .collect(),
        };
        blocks.join("\n\n")
    }

    fn structured_block(hit: &RetrievalHit) -> String {
        let meta = &hit.metadata;
        let mut lines = Vec::new();

        if let Some(entity) = meta.entity() {
            lines.push(format!("Entity: {}", entity));
        }
        if let Some(period) = meta.period() {
            lines.push(format!("Period: {}", period));
        }
        if let Some(projects) = meta.primary_projects() {
            lines.push(format!("Projects: {}", projects));
        }
        if let Some(allocations) = meta.allocations() {
            lines.push("Allocation:".to_string());
            for record in allocations {
                lines.push(format!("- {}: {}", record.project, record.share));
            }
        }
        lines.push(format!("Text: {}", hit.document));

        lines.join("\n")
    }

    /// Answer prompt sent to the streaming model
    pub fn build_answer_prompt(context: &str, query: &str) -> String {
        format!("Context:\n{}\n\nQuestion: {}\nAnswer:", context, query)
    }

    /// Instruction asking the model to structure a question into the filter schema
    pub fn build_extraction_prompt(question: &str) -> String {
        format!(
            r#"Extract search filters from the question below.

Reply with exactly one line of JSON and nothing else:
{{"entity": "...", "period": "...", "project": "..."}}

- entity: the person or team the question is about
- period: the time period exactly as written (e.g. 2024-Q1)
- project: a single project name
Use "" for any field the question does not mention.

Question: {}"#,
            question
        )
    }
}
