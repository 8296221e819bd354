//! Query request types

use serde::{Deserialize, Serialize};

/// Query string for `GET /search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// The question to answer
    #[serde(default)]
    pub query: String,

    /// Number of passages to retrieve (defaults to the configured value)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// JSON body for `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub query: String,

    /// Number of passages to retrieve (defaults to the configured value)
    #[serde(default)]
    pub top_k: Option<usize>,
}
