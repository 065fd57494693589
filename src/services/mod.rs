//! Services layer for Daemon AI
//!
//! Provides the completion collaborator contract and its implementations:
//! direct LLM calls for the backend, HTTP calls for clients.

pub mod completion;
pub mod http;
pub mod llm;
pub mod span_locator;

pub use completion::{CompletionService, LlmCompletionService, RewriteRequest};
pub use http::HttpCollaborator;
pub use llm::LlmService;
