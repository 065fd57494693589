//! Engine change notifications
//!
//! Every engine state change is published on a broadcast channel. Callers
//! re-render from engine state when they see an event; the events carry ids,
//! never copies of the queue.

use crate::types::{DaemonId, SuggestionId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Why a suggestion left the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Applied,
    Rejected,
    Dismissed,
    Cleared,
    DaemonDeleted,
}

/// Engine event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// New suggestion appended to the queue
    SuggestionAdded {
        id: SuggestionId,
        daemon_id: DaemonId,
        is_outdated: bool,
    },
    SuggestionRemoved {
        id: SuggestionId,
        reason: RemovalReason,
    },
    SelectionChanged {
        selected: Option<SuggestionId>,
    },
    /// Members whose span no longer refers to the document
    SuggestionsOutdated {
        ids: Vec<SuggestionId>,
    },
    /// Document content replaced by an applied rewrite
    DocumentReplaced {
        revision: u64,
    },
    /// Suggestion request failed or returned an unusable draft
    RequestFailed {
        daemon_id: DaemonId,
        message: String,
    },
    ApplyStarted {
        id: SuggestionId,
    },
    ApplyFailed {
        id: SuggestionId,
        message: String,
    },
    /// Rewrite arrived after its suggestion was removed or outdated
    ApplyDiscarded {
        id: SuggestionId,
    },
    AnswerReady {
        id: SuggestionId,
        answer: String,
    },
    AnswerFailed {
        id: SuggestionId,
        message: String,
    },
    /// Non-fatal, user-visible message
    Notice {
        message: String,
    },
}

/// Broadcasts engine events to any number of subscribers
#[derive(Debug, Clone)]
pub struct EngineEvents {
    tx: broadcast::Sender<EngineEvent>,
}

impl EngineEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: EngineEvent) {
        // send only fails when nobody is listening
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EngineEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
