//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use daemon_ai_core::services::RewriteRequest;
use daemon_ai_core::{CollaboratorError, CompletionService, Daemon, SuggestionDraft};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// Daemon with a predictable name and color
pub fn daemon(id: &str) -> Daemon {
    Daemon {
        id: id.to_string(),
        name: format!("Daemon {}", id),
        prompt: format!("You are {}", id),
        examples: vec![],
        guardrails: None,
        color: format!("#{:0>6}", id.len()),
    }
}

/// Draft highlighting the first occurrence of `word` in `snapshot`
pub fn draft_on_word(daemon_id: &str, snapshot: &str, word: &str) -> SuggestionDraft {
    let byte_start = snapshot
        .find(word)
        .unwrap_or_else(|| panic!("{:?} not in {:?}", word, snapshot));
    let start = snapshot[..byte_start].chars().count();
    let end = start + word.chars().count();
    SuggestionDraft {
        span_text: Some(word.to_string()),
        start_index: Some(start),
        end_index: Some(end),
        ..SuggestionDraft::question_only(format!("{}: is '{}' right?", daemon_id, word), snapshot)
    }
}

struct PendingSuggestion {
    daemon_id: String,
    snapshot: String,
    reply: oneshot::Sender<Result<SuggestionDraft, CollaboratorError>>,
}

struct PendingRewrite {
    request: RewriteRequest,
    reply: oneshot::Sender<Result<String, CollaboratorError>>,
}

/// Completion service whose calls block until the test releases them
///
/// Lets a test choose the order in which concurrent requests complete.
#[derive(Default)]
pub struct GatedCompletion {
    suggestions: Mutex<Vec<PendingSuggestion>>,
    rewrites: Mutex<Vec<PendingRewrite>>,
}

const GATE_TIMEOUT: Duration = Duration::from_secs(2);

impl GatedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the oldest outstanding request to `daemon_id` with a span on `word`
    pub async fn release(&self, daemon_id: &str, word: &str) {
        let pending = self.take_suggestion(daemon_id).await;
        let draft = draft_on_word(daemon_id, &pending.snapshot, word);
        let _ = pending.reply.send(Ok(draft));
    }

    /// Complete the oldest outstanding request to `daemon_id` with a custom draft
    pub async fn release_with<F>(&self, daemon_id: &str, build: F)
    where
        F: FnOnce(&str) -> SuggestionDraft,
    {
        let pending = self.take_suggestion(daemon_id).await;
        let draft = build(&pending.snapshot);
        let _ = pending.reply.send(Ok(draft));
    }

    /// Fail the oldest outstanding request to `daemon_id`
    pub async fn fail(&self, daemon_id: &str) {
        let pending = self.take_suggestion(daemon_id).await;
        let _ = pending
            .reply
            .send(Err(CollaboratorError::Request("connection refused".to_string())));
    }

    /// Complete the oldest outstanding rewrite, returning what was asked
    pub async fn finish_rewrite(&self, text: &str) -> RewriteRequest {
        let pending = self.take_rewrite().await;
        let _ = pending.reply.send(Ok(text.to_string()));
        pending.request
    }

    pub async fn fail_rewrite(&self) -> RewriteRequest {
        let pending = self.take_rewrite().await;
        let _ = pending
            .reply
            .send(Err(CollaboratorError::Request("502 Bad Gateway".to_string())));
        pending.request
    }

    async fn take_suggestion(&self, daemon_id: &str) -> PendingSuggestion {
        let wait = async {
            loop {
                {
                    let mut pending = self.suggestions.lock().unwrap();
                    if let Some(i) = pending.iter().position(|p| p.daemon_id == daemon_id) {
                        return pending.remove(i);
                    }
                }
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(GATE_TIMEOUT, wait)
            .await
            .unwrap_or_else(|_| panic!("no request to {} arrived", daemon_id))
    }

    async fn take_rewrite(&self) -> PendingRewrite {
        let wait = async {
            loop {
                {
                    let mut pending = self.rewrites.lock().unwrap();
                    if !pending.is_empty() {
                        return pending.remove(0);
                    }
                }
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(GATE_TIMEOUT, wait)
            .await
            .expect("no rewrite request arrived")
    }
}

#[async_trait]
impl CompletionService for GatedCompletion {
    async fn request_suggestion(
        &self,
        daemon: &Daemon,
        text: &str,
    ) -> Result<SuggestionDraft, CollaboratorError> {
        let (tx, rx) = oneshot::channel();
        self.suggestions.lock().unwrap().push(PendingSuggestion {
            daemon_id: daemon.id.clone(),
            snapshot: text.to_string(),
            reply: tx,
        });
        rx.await
            .unwrap_or_else(|_| Err(CollaboratorError::Request("gate dropped".to_string())))
    }

    async fn apply_rewrite(&self, request: &RewriteRequest) -> Result<String, CollaboratorError> {
        let (tx, rx) = oneshot::channel();
        self.rewrites.lock().unwrap().push(PendingRewrite {
            request: request.clone(),
            reply: tx,
        });
        rx.await
            .unwrap_or_else(|_| Err(CollaboratorError::Request("gate dropped".to_string())))
    }

    async fn request_answer(
        &self,
        daemon_id: &str,
        question: &str,
        span_text: &str,
    ) -> Result<String, CollaboratorError> {
        Ok(format!("{} on {:?}: consider {}", daemon_id, span_text, question))
    }
}

/// Completion service answering immediately and deterministically
///
/// Suggestions highlight the first word; daemons listed in `failing` error
/// and daemons listed in `rejecting` fail validation. Rewrites upper-case the
/// document. Answers for unknown daemons are `NotFound`.
#[derive(Default)]
pub struct ScriptedCompletion {
    pub failing: Vec<String>,
    pub rejecting: Vec<String>,
    pub known: Vec<String>,
}

impl ScriptedCompletion {
    pub fn new(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing(mut self, daemon_id: &str) -> Self {
        self.failing.push(daemon_id.to_string());
        self
    }

    pub fn rejecting(mut self, daemon_id: &str) -> Self {
        self.rejecting.push(daemon_id.to_string());
        self
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn request_suggestion(
        &self,
        daemon: &Daemon,
        text: &str,
    ) -> Result<SuggestionDraft, CollaboratorError> {
        if self.failing.contains(&daemon.id) {
            return Err(CollaboratorError::Request("model unavailable".to_string()));
        }
        if self.rejecting.contains(&daemon.id) {
            return Err(CollaboratorError::validation("text", "Text is required"));
        }
        let word = text.split_whitespace().next().unwrap_or_default();
        if word.is_empty() {
            return Ok(SuggestionDraft::question_only(
                format!("[{}] Anything to add?", daemon.name),
                text,
            ));
        }
        Ok(draft_on_word(&daemon.id, text, word))
    }

    async fn apply_rewrite(&self, request: &RewriteRequest) -> Result<String, CollaboratorError> {
        Ok(request.original_text.to_uppercase())
    }

    async fn request_answer(
        &self,
        daemon_id: &str,
        question: &str,
        _span_text: &str,
    ) -> Result<String, CollaboratorError> {
        if !self.known.iter().any(|k| k == daemon_id) {
            return Err(CollaboratorError::NotFound(daemon_id.to_string()));
        }
        Ok(format!("Answering: {}", question))
    }
}
