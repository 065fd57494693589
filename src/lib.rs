//! Daemon AI - span-anchored writing suggestions from concurrent AI daemons
//!
//! A document is reviewed by several independent "daemons" (AI personas).
//! Each request to a daemon yields one suggestion anchored to a character
//! range of the document. Suggestions queue up in arrival order; the user
//! navigates them and applies, rejects or dismisses each one.
//!
//! # Architecture
//!
//! - **Types**: daemons, spans, suggestions and their wire forms
//! - **Engine**: the suggestion queue, selection and apply protocol
//! - **Catalog**: daemon definitions (in-memory for the backend)
//! - **Services**: LLM access, span location, HTTP client collaborator
//! - **API**: the axum backend the HTTP collaborator talks to
//!
//! # Example
//!
//! ```ignore
//! use daemon_ai_core::{AppConfig, Document, HttpCollaborator, SuggestionEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let backend = Arc::new(HttpCollaborator::new(&config)?);
//!     let mut engine = SuggestionEngine::new(
//!         backend.clone(),
//!         backend,
//!         Document::new("Its a draft."),
//!     );
//!
//!     let daemon = engine.list_daemons().await?.remove(0);
//!     engine.request_suggestion(daemon);
//!     engine.next_completion().await;
//!     if let Some(selected) = engine.selected() {
//!         engine.apply_suggestion(selected.id())?;
//!     }
//!     engine.settle().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use catalog::{DaemonCatalog, InMemoryCatalog};
pub use config::AppConfig;
pub use document::Document;
pub use engine::{EngineEvent, Highlight, Outcome, RemovalReason, SuggestionEngine};
pub use error::{CollaboratorError, DaemonError, EngineError, Result, SpanError};
pub use services::{CompletionService, HttpCollaborator, LlmCompletionService, LlmService};
pub use types::{Daemon, DaemonId, NewDaemon, Span, Suggestion, SuggestionDraft, SuggestionId};
