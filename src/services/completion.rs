//! Completion collaborator contract
//!
//! The engine asks this collaborator for suggestions, full-document rewrites
//! and answers. Implementations: [`LlmCompletionService`] (calls the model
//! directly, used by the backend) and [`crate::services::http::HttpCollaborator`]
//! (calls the backend over HTTP, used by clients).

use crate::catalog::DaemonCatalog;
use crate::error::CollaboratorError;
use crate::services::llm::LlmService;
use crate::services::span_locator;
use crate::types::{Daemon, SuggestionDraft};
use crate::utils::string::truncate_at_char_boundary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Context for rewriting the document around one suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub original_text: String,
    pub question: String,
    #[serde(default)]
    pub span_text: Option<String>,
    #[serde(default)]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: Option<usize>,
    pub daemon_name: String,
}

/// Text-completion collaborator
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Ask `daemon` for one suggestion about `text`
    async fn request_suggestion(
        &self,
        daemon: &Daemon,
        text: &str,
    ) -> Result<SuggestionDraft, CollaboratorError>;

    /// Produce the complete replacement document
    async fn apply_rewrite(&self, request: &RewriteRequest) -> Result<String, CollaboratorError>;

    /// Elaborate on a question about a span, in the voice of `daemon_id`
    async fn request_answer(
        &self,
        daemon_id: &str,
        question: &str,
        span_text: &str,
    ) -> Result<String, CollaboratorError>;
}

/// Completion collaborator backed by the LLM API
///
/// Answers are requested by daemon id, so the service keeps a catalog handle
/// to resolve the persona.
pub struct LlmCompletionService {
    llm: LlmService,
    catalog: Arc<dyn DaemonCatalog>,
}

impl LlmCompletionService {
    pub fn new(llm: LlmService, catalog: Arc<dyn DaemonCatalog>) -> Self {
        Self { llm, catalog }
    }

    async fn find_daemon(&self, id: &str) -> Result<Daemon, CollaboratorError> {
        self.catalog
            .list()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CollaboratorError::NotFound(id.to_string()))
    }
}

/// Question used when the model cannot be reached
pub fn fallback_question(daemon: &Daemon) -> String {
    format!("[{}] What could be improved in this section?", daemon.name)
}

/// Answer used when the model cannot be reached
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I'm having trouble generating a response right now. Please try again.";

#[async_trait]
impl CompletionService for LlmCompletionService {
    async fn request_suggestion(
        &self,
        daemon: &Daemon,
        text: &str,
    ) -> Result<SuggestionDraft, CollaboratorError> {
        debug!(
            "Processing text with {}: {}",
            daemon.name,
            truncate_at_char_boundary(text, 100)
        );

        let question = match self.llm.generate_question(text, daemon).await {
            Ok(question) => question,
            Err(e) => {
                warn!("Error generating suggestion for {}: {}", daemon.id, e);
                fallback_question(daemon)
            }
        };

        let located = match self.llm.identify_span(text, &question).await {
            Ok(reply) => span_locator::locate_reply(text, &reply),
            Err(e) => {
                warn!("Span lookup failed, using keyword fallback: {}", e);
                span_locator::locate_by_keywords(text, &question)
            }
        };

        let mut draft = SuggestionDraft::question_only(question, text);
        if let Some(span) = located {
            debug!(
                "Span text: '{}', start: {}, end: {}",
                span.text(),
                span.start(),
                span.end()
            );
            draft.span_text = Some(span.text().to_string());
            draft.start_index = Some(span.start());
            draft.end_index = Some(span.end());
        }
        Ok(draft)
    }

    async fn apply_rewrite(&self, request: &RewriteRequest) -> Result<String, CollaboratorError> {
        self.llm
            .rewrite_document(request)
            .await
            .map_err(|e| CollaboratorError::Request(e.to_string()))
    }

    async fn request_answer(
        &self,
        daemon_id: &str,
        question: &str,
        span_text: &str,
    ) -> Result<String, CollaboratorError> {
        let daemon = self.find_daemon(daemon_id).await?;
        match self.llm.generate_answer(question, span_text, &daemon).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!("Error generating answer: {}", e);
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::config::AppConfig;

    fn daemon() -> Daemon {
        Daemon {
            id: "coach".to_string(),
            name: "Clarity Coach".to_string(),
            prompt: "Be clear".to_string(),
            examples: vec![],
            guardrails: None,
            color: "#3498db".to_string(),
        }
    }

    /// Service pointed at an unreachable endpoint so every LLM call fails fast
    fn offline_service() -> LlmCompletionService {
        let config = AppConfig {
            llm_base_url: "http://127.0.0.1:9".to_string(),
            openai_api_key: "sk-test".to_string(),
            request_timeout_secs: 2,
            ..AppConfig::default()
        };
        LlmCompletionService::new(
            LlmService::new(&config).unwrap(),
            Arc::new(InMemoryCatalog::with_builtins()),
        )
    }

    #[tokio::test]
    async fn test_suggestion_falls_back_when_model_unreachable() {
        let service = offline_service();
        let text = "The implementation was effective. It shipped on time.";
        let draft = service.request_suggestion(&daemon(), text).await.unwrap();

        assert_eq!(draft.question, "[Clarity Coach] What could be improved in this section?");
        assert_eq!(draft.snapshot, text);
        // No question keyword occurs in the text, so the first sentence is used
        let span = draft.resolve_span().unwrap().unwrap();
        assert_eq!(span.text(), "The implementation was effective.");
    }

    #[tokio::test]
    async fn test_answer_falls_back_when_model_unreachable() {
        let service = offline_service();
        let answer = service
            .request_answer("clarity_coach", "Why?", "some span")
            .await
            .unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_answer_for_unknown_daemon() {
        let service = offline_service();
        assert_eq!(
            service.request_answer("ghost", "Why?", "").await,
            Err(CollaboratorError::NotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_rewrite_failure_propagates() {
        let service = offline_service();
        let request = RewriteRequest {
            original_text: "text".to_string(),
            question: "Why?".to_string(),
            span_text: None,
            start_index: None,
            end_index: None,
            daemon_name: "Clarity Coach".to_string(),
        };
        assert!(matches!(
            service.apply_rewrite(&request).await,
            Err(CollaboratorError::Request(_))
        ));
    }
}
