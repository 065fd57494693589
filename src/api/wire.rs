//! Request and response bodies of the backend HTTP API
//!
//! Shared by the axum server and the reqwest client so both ends agree on
//! field names.

use crate::types::{Daemon, DaemonId, SuggestionPayload};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of suggestion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonList {
    pub daemons: Vec<Daemon>,
}

/// Result of adding or deleting a daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonChange {
    pub id: DaemonId,
    pub status: String,
    pub daemon: Daemon,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestion: SuggestionPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResponse {
    pub improved_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub daemon_id: DaemonId,
    pub question: String,
    #[serde(default)]
    pub span_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub daemon_id: DaemonId,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub daemons_count: usize,
    pub api_key_configured: bool,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Offending field for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
