//! Suggestion engine
//!
//! Owns the document, the suggestion queue and the selection. Collaborator
//! calls run as spawned tasks; each result comes back through a completion
//! channel tagged with what it was for, and is applied to engine state only
//! when the caller polls [`SuggestionEngine::next_completion`] or
//! [`SuggestionEngine::drain_completions`]. All mutation therefore happens on
//! the caller's task, in arrival order.
//!
//! Suggestion lifecycle: `Pending` → (optionally) outdated → removed, with the
//! removal reason carried on [`EngineEvent::SuggestionRemoved`].

mod events;
mod highlight;
mod queue;

pub use events::{EngineEvent, EngineEvents, RemovalReason};
pub use highlight::Highlight;
pub use queue::SuggestionQueue;

use crate::catalog::{is_builtin, DaemonCatalog};
use crate::document::Document;
use crate::error::{CollaboratorError, EngineError};
use crate::services::completion::{CompletionService, RewriteRequest};
use crate::types::{Daemon, DaemonId, NewDaemon, Suggestion, SuggestionDraft, SuggestionId};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Result of one collaborator call, tagged with the request it answers
#[derive(Debug)]
enum Completion {
    Suggestion {
        daemon: Daemon,
        result: Result<SuggestionDraft, CollaboratorError>,
    },
    Rewrite {
        id: SuggestionId,
        base_revision: u64,
        result: Result<String, CollaboratorError>,
    },
    Answer {
        id: SuggestionId,
        result: Result<String, CollaboratorError>,
    },
}

/// What applying one completion did to engine state
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Suggestion appended and selected
    Added(SuggestionId),
    /// Collaborator failed; nothing appended
    RequestFailed {
        daemon_id: DaemonId,
        error: CollaboratorError,
    },
    /// Draft rejected on arrival
    Malformed { daemon_id: DaemonId, reason: String },
    /// Document rewritten and suggestion removed
    Applied { id: SuggestionId, revision: u64 },
    /// Rewrite failed; no state change
    ApplyFailed {
        id: SuggestionId,
        error: CollaboratorError,
    },
    /// Rewrite arrived too late to be used; no state change
    ApplyDiscarded { id: SuggestionId },
    Answered { id: SuggestionId, answer: String },
    AnswerFailed {
        id: SuggestionId,
        error: CollaboratorError,
    },
}

/// Coordinates daemons, suggestions and the document
pub struct SuggestionEngine {
    catalog: Arc<dyn DaemonCatalog>,
    completion: Arc<dyn CompletionService>,
    document: Document,
    queue: SuggestionQueue,
    /// Suggestions with a rewrite in flight
    applying: HashSet<SuggestionId>,
    next_id: u64,
    /// Dispatched calls whose completion has not been handled yet
    pending: usize,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    events: EngineEvents,
}

impl SuggestionEngine {
    pub fn new(
        catalog: Arc<dyn DaemonCatalog>,
        completion: Arc<dyn CompletionService>,
        document: Document,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            catalog,
            completion,
            document,
            queue: SuggestionQueue::new(),
            applying: HashSet::new(),
            next_id: 1,
            pending: 0,
            tx,
            rx,
            events: EngineEvents::default(),
        }
    }

    /// Receive every subsequent engine event
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for user edits and saving
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Replace the document with the user's latest text
    ///
    /// Suggestions keep their spans; highlights clamp against the new text.
    pub fn sync_document(&mut self, text: &str) {
        let before = self.document.revision();
        self.document.set_text(text);
        if self.document.revision() != before {
            debug!("Document synced to revision {}", self.document.revision());
        }
    }

    pub fn queue(&self) -> &SuggestionQueue {
        &self.queue
    }

    pub fn suggestions(&self) -> impl Iterator<Item = &Suggestion> {
        self.queue.iter()
    }

    pub fn suggestion(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.queue.get(id)
    }

    pub fn selected(&self) -> Option<&Suggestion> {
        self.queue.selected_suggestion()
    }

    /// `(n, m)` for an "n of m" status line
    pub fn position(&self) -> Option<(usize, usize)> {
        let selected = self.queue.selected()?;
        let index = self.queue.index_of(selected)?;
        Some((index + 1, self.queue.len()))
    }

    /// Selected suggestion's span projected onto the current document
    pub fn highlight(&self) -> Option<Highlight> {
        self.selected()
            .and_then(|s| Highlight::project(&self.document, s))
    }

    pub fn is_applying(&self, id: SuggestionId) -> bool {
        self.applying.contains(&id)
    }

    /// Collaborator calls dispatched but not yet handled
    pub fn pending(&self) -> usize {
        self.pending
    }

    // ---- daemons ----

    pub async fn list_daemons(&self) -> Result<Vec<Daemon>, EngineError> {
        Ok(self.catalog.list().await?)
    }

    /// Validate locally, then create through the catalog
    pub async fn create_daemon(&self, new: NewDaemon) -> Result<Daemon, EngineError> {
        new.validate()?;
        let daemon = self.catalog.create(new).await?;
        info!("Created daemon {} ({})", daemon.name, daemon.id);
        Ok(daemon)
    }

    /// Delete a daemon and cascade-remove its suggestions
    ///
    /// A daemon that is already gone is reported as a notice and the cascade
    /// still runs. Refusals (protected, request failure) leave local state
    /// untouched. Returns the removed suggestion ids.
    pub async fn delete_daemon(&mut self, daemon_id: &str) -> Result<Vec<SuggestionId>, EngineError> {
        if is_builtin(daemon_id) {
            return Err(CollaboratorError::Protected(daemon_id.to_string()).into());
        }

        match self.catalog.delete(daemon_id).await {
            Ok(daemon) => info!("Deleted daemon {} ({})", daemon.name, daemon.id),
            Err(err @ CollaboratorError::NotFound(_)) => {
                debug!("Daemon {} already removed", daemon_id);
                self.events.emit(EngineEvent::Notice {
                    message: err.user_message(),
                });
            }
            Err(err) => {
                warn!("Failed to delete daemon {}: {}", daemon_id, err);
                return Err(err.into());
            }
        }

        Ok(self.on_daemon_deleted(daemon_id))
    }

    /// Remove every suggestion authored by `daemon_id`
    pub fn on_daemon_deleted(&mut self, daemon_id: &str) -> Vec<SuggestionId> {
        let before = self.queue.selected();
        let removed: Vec<SuggestionId> = self
            .queue
            .remove_by_daemon(daemon_id)
            .iter()
            .map(|s| s.id())
            .collect();

        for id in &removed {
            self.events.emit(EngineEvent::SuggestionRemoved {
                id: *id,
                reason: RemovalReason::DaemonDeleted,
            });
        }
        if before.is_some() && self.queue.selected().is_none() {
            self.queue.select_first();
        }
        self.selection_changed(before);

        if !removed.is_empty() {
            debug!(
                "Removed {} suggestion(s) from deleted daemon {}",
                removed.len(),
                daemon_id
            );
        }
        removed
    }

    // ---- suggestions ----

    /// Ask `daemon` for a suggestion about the current document
    ///
    /// Must be called within a tokio runtime. The result is applied on a later
    /// [`next_completion`](Self::next_completion).
    pub fn request_suggestion(&mut self, daemon: Daemon) {
        let text = self.document.text();
        let completion = Arc::clone(&self.completion);
        debug!("Requesting suggestion from {}", daemon.id);

        let asked = daemon.clone();
        self.dispatch(
            async move { completion.request_suggestion(&asked, &text).await },
            move |result| Completion::Suggestion { daemon, result },
        );
    }

    /// Start rewriting the document around suggestion `id`
    ///
    /// Refused when the suggestion is not queued, is outdated, or already has
    /// a rewrite in flight. Success or failure arrives as a completion.
    pub fn apply_suggestion(&mut self, id: SuggestionId) -> Result<(), EngineError> {
        let suggestion = self.queue.get(id).ok_or(EngineError::NotQueued(id))?;
        if suggestion.is_outdated() {
            return Err(EngineError::Outdated(id));
        }
        if self.applying.contains(&id) {
            return Err(EngineError::ApplyInFlight(id));
        }

        let request = RewriteRequest {
            original_text: self.document.text(),
            question: suggestion.question.clone(),
            span_text: suggestion.span.as_ref().map(|s| s.text().to_string()),
            start_index: suggestion.span.as_ref().map(|s| s.start()),
            end_index: suggestion.span.as_ref().map(|s| s.end()),
            daemon_name: suggestion.daemon_name.clone(),
        };
        let base_revision = self.document.revision();
        self.applying.insert(id);
        self.events.emit(EngineEvent::ApplyStarted { id });
        info!("Applying suggestion {} from {}", id, request.daemon_name);

        let completion = Arc::clone(&self.completion);
        self.dispatch(
            async move { completion.apply_rewrite(&request).await },
            move |result| Completion::Rewrite {
                id,
                base_revision,
                result,
            },
        );
        Ok(())
    }

    /// Ask the authoring daemon to elaborate on suggestion `id`
    pub fn request_answer(&mut self, id: SuggestionId) -> Result<(), EngineError> {
        let suggestion = self.queue.get(id).ok_or(EngineError::NotQueued(id))?;
        let daemon_id = suggestion.daemon_id.clone();
        let question = suggestion.question.clone();
        let span_text = suggestion
            .span
            .as_ref()
            .map(|s| s.text().to_string())
            .unwrap_or_default();

        let completion = Arc::clone(&self.completion);
        self.dispatch(
            async move {
                completion
                    .request_answer(&daemon_id, &question, &span_text)
                    .await
            },
            move |result| Completion::Answer { id, result },
        );
        Ok(())
    }

    /// Drop suggestion `id` as unwanted
    pub fn reject_suggestion(&mut self, id: SuggestionId) -> Result<Suggestion, EngineError> {
        self.remove_local(id, RemovalReason::Rejected)
    }

    /// Drop suggestion `id` without judgement
    pub fn dismiss_suggestion(&mut self, id: SuggestionId) -> Result<Suggestion, EngineError> {
        self.remove_local(id, RemovalReason::Dismissed)
    }

    /// Empty the queue and the selection
    pub fn clear(&mut self) -> usize {
        let before = self.queue.selected();
        let removed = self.queue.clear();
        for suggestion in &removed {
            self.events.emit(EngineEvent::SuggestionRemoved {
                id: suggestion.id(),
                reason: RemovalReason::Cleared,
            });
        }
        self.selection_changed(before);
        removed.len()
    }

    pub fn select(&mut self, id: SuggestionId) -> Result<(), EngineError> {
        let before = self.queue.selected();
        if !self.queue.select(id) {
            return Err(EngineError::NotQueued(id));
        }
        self.selection_changed(before);
        Ok(())
    }

    /// Move the selection forward, wrapping at the tail
    pub fn select_next(&mut self) -> Option<SuggestionId> {
        let before = self.queue.selected();
        match before {
            Some(current) => {
                if let Some(next) = self.queue.next(current) {
                    self.queue.select(next);
                }
            }
            None => self.queue.select_first(),
        }
        self.selection_changed(before);
        self.queue.selected()
    }

    /// Move the selection backward, wrapping at the head
    pub fn select_previous(&mut self) -> Option<SuggestionId> {
        let before = self.queue.selected();
        match before {
            Some(current) => {
                if let Some(previous) = self.queue.previous(current) {
                    self.queue.select(previous);
                }
            }
            None => self.queue.select_index(self.queue.len().saturating_sub(1)),
        }
        self.selection_changed(before);
        self.queue.selected()
    }

    // ---- completions ----

    /// Wait for the next collaborator result and apply it
    ///
    /// Returns `None` immediately when nothing is in flight. Cancel safe.
    pub async fn next_completion(&mut self) -> Option<Outcome> {
        if self.pending == 0 {
            return None;
        }
        let completion = self.rx.recv().await?;
        Some(self.handle(completion))
    }

    /// Apply every result that has already arrived, without waiting
    pub fn drain_completions(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            outcomes.push(self.handle(completion));
        }
        outcomes
    }

    /// Wait until every dispatched call has been handled
    pub async fn settle(&mut self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_completion().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run `call` on its own task and route its result back tagged by `tag`
    ///
    /// A call that panics still produces exactly one completion, carrying a
    /// request error, so `pending` always drains.
    fn dispatch<T, F, W>(&mut self, call: F, tag: W)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CollaboratorError>> + Send + 'static,
        W: FnOnce(Result<T, CollaboratorError>) -> Completion + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::spawn(call).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Collaborator task failed: {}", e);
                    Err(CollaboratorError::Request(format!(
                        "collaborator task failed: {}",
                        e
                    )))
                }
            };
            // The receiver lives as long as the engine; a send error means
            // the engine is gone and the result has nowhere to go.
            let _ = tx.send(tag(result));
        });
    }

    fn handle(&mut self, completion: Completion) -> Outcome {
        self.pending = self.pending.saturating_sub(1);
        match completion {
            Completion::Suggestion { daemon, result } => self.on_suggestion(daemon, result),
            Completion::Rewrite {
                id,
                base_revision,
                result,
            } => self.on_rewrite(id, base_revision, result),
            Completion::Answer { id, result } => self.on_answer(id, result),
        }
    }

    fn on_suggestion(
        &mut self,
        daemon: Daemon,
        result: Result<SuggestionDraft, CollaboratorError>,
    ) -> Outcome {
        let draft = match result {
            Ok(draft) => draft,
            Err(error) => {
                warn!("Suggestion request to {} failed: {}", daemon.id, error);
                self.events.emit(EngineEvent::RequestFailed {
                    daemon_id: daemon.id.clone(),
                    message: error.user_message(),
                });
                return Outcome::RequestFailed {
                    daemon_id: daemon.id,
                    error,
                };
            }
        };

        if draft.question.trim().is_empty() {
            return self.malformed(daemon.id, "suggestion has no question".to_string());
        }
        let span = match draft.resolve_span() {
            Ok(span) => span,
            Err(e) => return self.malformed(daemon.id, e.to_string()),
        };

        let id = self.allocate_id();
        let mut suggestion = Suggestion::new(id, &daemon, draft.question, span, draft.suggested_fix);
        // Indices were computed against older text
        if !self.document.matches(&draft.snapshot) {
            suggestion.mark_outdated();
        }
        let is_outdated = suggestion.is_outdated();

        self.queue.append(suggestion);
        info!(
            "Suggestion {} from {} queued ({} total)",
            id,
            daemon.id,
            self.queue.len()
        );
        self.events.emit(EngineEvent::SuggestionAdded {
            id,
            daemon_id: daemon.id,
            is_outdated,
        });

        // Latest arrival wins the selection
        let before = self.queue.selected();
        self.queue.select(id);
        self.selection_changed(before);
        Outcome::Added(id)
    }

    fn malformed(&mut self, daemon_id: DaemonId, reason: String) -> Outcome {
        warn!("Rejected suggestion from {}: {}", daemon_id, reason);
        self.events.emit(EngineEvent::RequestFailed {
            daemon_id: daemon_id.clone(),
            message: format!("Received an unusable suggestion: {}", reason),
        });
        Outcome::Malformed { daemon_id, reason }
    }

    fn on_rewrite(
        &mut self,
        id: SuggestionId,
        base_revision: u64,
        result: Result<String, CollaboratorError>,
    ) -> Outcome {
        self.applying.remove(&id);

        let text = match result {
            Ok(text) => text,
            Err(error) => {
                warn!("Applying suggestion {} failed: {}", id, error);
                self.events.emit(EngineEvent::ApplyFailed {
                    id,
                    message: error.user_message(),
                });
                return Outcome::ApplyFailed { id, error };
            }
        };

        let still_applicable = self.queue.get(id).map_or(false, |s| !s.is_outdated());
        if !still_applicable || self.document.revision() != base_revision {
            info!("Discarding stale rewrite for suggestion {}", id);
            self.events.emit(EngineEvent::ApplyDiscarded { id });
            return Outcome::ApplyDiscarded { id };
        }

        self.document.set_text(&text);
        let revision = self.document.revision();
        self.events.emit(EngineEvent::DocumentReplaced { revision });

        let before = self.queue.selected();
        if let Some((index, _)) = self.queue.remove(id) {
            self.events.emit(EngineEvent::SuggestionRemoved {
                id,
                reason: RemovalReason::Applied,
            });
            let outdated = self.queue.mark_all_outdated();
            if !outdated.is_empty() {
                self.events
                    .emit(EngineEvent::SuggestionsOutdated { ids: outdated });
            }
            self.queue.select_index(index.saturating_sub(1));
        }
        self.selection_changed(before);

        info!("Applied suggestion {} (revision {})", id, revision);
        Outcome::Applied { id, revision }
    }

    fn on_answer(&mut self, id: SuggestionId, result: Result<String, CollaboratorError>) -> Outcome {
        match result {
            Ok(answer) => {
                self.events.emit(EngineEvent::AnswerReady {
                    id,
                    answer: answer.clone(),
                });
                Outcome::Answered { id, answer }
            }
            Err(error) => {
                warn!("Answer for suggestion {} failed: {}", id, error);
                self.events.emit(EngineEvent::AnswerFailed {
                    id,
                    message: error.user_message(),
                });
                Outcome::AnswerFailed { id, error }
            }
        }
    }

    fn remove_local(
        &mut self,
        id: SuggestionId,
        reason: RemovalReason,
    ) -> Result<Suggestion, EngineError> {
        let before = self.queue.selected();
        let (_, removed) = self.queue.remove(id).ok_or(EngineError::NotQueued(id))?;
        self.events
            .emit(EngineEvent::SuggestionRemoved { id, reason });
        self.queue.select_first();
        self.selection_changed(before);
        debug!("Suggestion {} removed ({:?})", id, reason);
        Ok(removed)
    }

    fn selection_changed(&self, before: Option<SuggestionId>) {
        let selected = self.queue.selected();
        if selected != before {
            self.events.emit(EngineEvent::SelectionChanged { selected });
        }
    }

    fn allocate_id(&mut self) -> SuggestionId {
        let id = SuggestionId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }
}
