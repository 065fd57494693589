//! Core data types for Daemon AI
//!
//! Daemons are read-only reference data owned by the catalog. Suggestions are
//! owned by the engine and snapshot the identity of the daemon that authored
//! them, so later catalog edits never change an issued suggestion.

use crate::error::SpanError;
use crate::utils::string::{char_len, char_slice};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Daemon identifier (opaque, stable for the session)
pub type DaemonId = String;

/// Exemplar conversation turn used to prime a daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Sample user text
    pub user: String,
    /// Reply the daemon should give
    pub assistant: String,
}

/// A configured AI persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daemon {
    pub id: DaemonId,
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub examples: Vec<Example>,
    #[serde(default)]
    pub guardrails: Option<String>,
    /// Display color token (e.g. `#e74c3c`)
    pub color: String,
}

/// Request to create a daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDaemon {
    /// Caller-chosen id; a uuid is generated when absent
    #[serde(default)]
    pub id: Option<DaemonId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub guardrails: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

fn default_color() -> String {
    "#7f8c8d".to_string()
}

impl NewDaemon {
    /// Minimal definition with the default color and no examples
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            prompt: prompt.into(),
            guardrails: None,
            color: default_color(),
            examples: Vec::new(),
        }
    }

    /// Check required fields
    pub fn validate(&self) -> std::result::Result<(), crate::error::CollaboratorError> {
        use crate::error::CollaboratorError;

        if self.name.trim().is_empty() {
            return Err(CollaboratorError::validation("name", "Name is required"));
        }
        if self.prompt.trim().is_empty() {
            return Err(CollaboratorError::validation("prompt", "Prompt is required"));
        }
        Ok(())
    }

    /// Materialize into a daemon, assigning an id if needed
    pub fn into_daemon(self) -> Daemon {
        let guardrails = self.guardrails.filter(|g| !g.trim().is_empty());
        Daemon {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: self.name.trim().to_string(),
            prompt: self.prompt,
            examples: self.examples,
            guardrails,
            color: self.color,
        }
    }
}

/// Engine-issued suggestion identity
///
/// Never reused within an engine, so two suggestions with identical content
/// remain distinct entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(u64);

impl SuggestionId {
    /// Wrap a raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Half-open character range `[start, end)` into a text snapshot, plus the
/// literal text it covered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    start: usize,
    end: usize,
    text: String,
}

impl Span {
    /// Span over `snapshot[start..end]`, taking the text from the snapshot
    pub fn from_snapshot(snapshot: &str, start: usize, end: usize) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Inverted { start, end });
        }
        let text = char_slice(snapshot, start, end).ok_or(SpanError::OutOfRange {
            end,
            len: char_len(snapshot),
        })?;
        Ok(Self {
            start,
            end,
            text: text.to_string(),
        })
    }

    /// Span whose claimed text must equal `snapshot[start..end]`
    pub fn verified(
        snapshot: &str,
        start: usize,
        end: usize,
        claimed: &str,
    ) -> Result<Self, SpanError> {
        let span = Self::from_snapshot(snapshot, start, end)?;
        if span.text != claimed {
            return Err(SpanError::TextMismatch {
                expected: span.text,
                found: claimed.to_string(),
            });
        }
        Ok(span)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Candidate suggestion returned by the completion collaborator
///
/// `snapshot` is the text the indices were computed against. The engine
/// validates the span against it and never against a newer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionDraft {
    pub question: String,
    pub span_text: Option<String>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub suggested_fix: Option<String>,
    pub snapshot: String,
}

impl SuggestionDraft {
    /// Draft with no span
    pub fn question_only(question: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            span_text: None,
            start_index: None,
            end_index: None,
            suggested_fix: None,
            snapshot: snapshot.into(),
        }
    }

    /// Resolve the claimed span against the snapshot.
    ///
    /// An empty span means "nothing to highlight" and resolves to `None`.
    pub fn resolve_span(&self) -> Result<Option<Span>, SpanError> {
        let span = match (self.start_index, self.end_index) {
            (None, None) => return Ok(None),
            (Some(start), Some(end)) => match &self.span_text {
                Some(text) => Span::verified(&self.snapshot, start, end, text)?,
                None => Span::from_snapshot(&self.snapshot, start, end)?,
            },
            (start, end) => {
                return Err(SpanError::Incomplete {
                    start: start.is_some(),
                    end: end.is_some(),
                })
            }
        };
        Ok(if span.is_empty() { None } else { Some(span) })
    }
}

/// One proposal from one daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    id: SuggestionId,
    pub daemon_id: DaemonId,
    pub daemon_name: String,
    pub color: String,
    pub question: String,
    pub span: Option<Span>,
    pub suggested_fix: Option<String>,
    pub created_at: DateTime<Utc>,
    is_outdated: bool,
}

impl Suggestion {
    /// Snapshot a daemon's identity around a validated span
    pub fn new(
        id: SuggestionId,
        daemon: &Daemon,
        question: String,
        span: Option<Span>,
        suggested_fix: Option<String>,
    ) -> Self {
        Self {
            id,
            daemon_id: daemon.id.clone(),
            daemon_name: daemon.name.clone(),
            color: daemon.color.clone(),
            question,
            span,
            suggested_fix,
            created_at: Utc::now(),
            is_outdated: false,
        }
    }

    pub fn id(&self) -> SuggestionId {
        self.id
    }

    /// True once a different suggestion rewrote the document
    pub fn is_outdated(&self) -> bool {
        self.is_outdated
    }

    pub(crate) fn mark_outdated(&mut self) {
        self.is_outdated = true;
    }
}

/// Suggestion as carried on the wire between backend and client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionPayload {
    pub daemon_id: DaemonId,
    pub daemon_name: String,
    pub question: String,
    #[serde(default)]
    pub span_text: Option<String>,
    #[serde(default)]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    pub color: String,
}

impl SuggestionPayload {
    /// Wire form of a draft produced by `daemon`
    pub fn from_draft(daemon: &Daemon, draft: SuggestionDraft) -> Self {
        Self {
            daemon_id: daemon.id.clone(),
            daemon_name: daemon.name.clone(),
            question: draft.question,
            span_text: draft.span_text,
            start_index: draft.start_index,
            end_index: draft.end_index,
            suggested_fix: draft.suggested_fix,
            color: daemon.color.clone(),
        }
    }

    /// Draft anchored to the text that was sent with the request
    pub fn into_draft(self, snapshot: String) -> SuggestionDraft {
        SuggestionDraft {
            question: self.question,
            span_text: self.span_text,
            start_index: self.start_index,
            end_index: self.end_index,
            suggested_fix: self.suggested_fix,
            snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critic() -> Daemon {
        Daemon {
            id: "critic".to_string(),
            name: "Critic".to_string(),
            prompt: "Question everything".to_string(),
            examples: vec![],
            guardrails: None,
            color: "#e74c3c".to_string(),
        }
    }

    #[test]
    fn test_span_from_snapshot() {
        let span = Span::from_snapshot("the quick fox", 4, 9).unwrap();
        assert_eq!(span.text(), "quick");
        assert_eq!((span.start(), span.end()), (4, 9));
    }

    #[test]
    fn test_span_mismatch_rejected() {
        let err = Span::verified("the quick fox", 10, 14, "quic").unwrap_err();
        assert!(matches!(err, SpanError::OutOfRange { end: 14, len: 13 }));

        let err = Span::verified("the quick fox", 4, 8, "quid").unwrap_err();
        assert_eq!(
            err,
            SpanError::TextMismatch {
                expected: "quic".to_string(),
                found: "quid".to_string()
            }
        );
    }

    #[test]
    fn test_span_inverted() {
        assert_eq!(
            Span::from_snapshot("abc", 2, 1).unwrap_err(),
            SpanError::Inverted { start: 2, end: 1 }
        );
    }

    #[test]
    fn test_draft_empty_span_means_no_highlight() {
        let draft = SuggestionDraft {
            span_text: Some(String::new()),
            start_index: Some(0),
            end_index: Some(0),
            ..SuggestionDraft::question_only("Nothing to flag?", "some text")
        };
        assert_eq!(draft.resolve_span().unwrap(), None);
    }

    #[test]
    fn test_draft_half_span_is_malformed() {
        let draft = SuggestionDraft {
            start_index: Some(3),
            ..SuggestionDraft::question_only("Why?", "some text")
        };
        assert!(matches!(
            draft.resolve_span(),
            Err(SpanError::Incomplete { start: true, end: false })
        ));
    }

    #[test]
    fn test_draft_span_without_text_takes_snapshot() {
        let draft = SuggestionDraft {
            start_index: Some(5),
            end_index: Some(9),
            ..SuggestionDraft::question_only("Why?", "some text")
        };
        assert_eq!(draft.resolve_span().unwrap().unwrap().text(), "text");
    }

    #[test]
    fn test_suggestion_snapshots_daemon_identity() {
        let mut daemon = critic();
        let suggestion = Suggestion::new(
            SuggestionId::from_raw(1),
            &daemon,
            "Evidence?".to_string(),
            None,
            None,
        );
        daemon.name = "Renamed".to_string();
        daemon.color = "#000000".to_string();

        assert_eq!(suggestion.daemon_name, "Critic");
        assert_eq!(suggestion.color, "#e74c3c");
        assert!(!suggestion.is_outdated());
    }

    #[test]
    fn test_new_daemon_validation() {
        assert!(NewDaemon::new("Critic", "Be critical").validate().is_ok());
        assert!(NewDaemon::new("  ", "Be critical").validate().is_err());
        assert!(NewDaemon::new("Critic", "").validate().is_err());
    }

    #[test]
    fn test_new_daemon_generates_id() {
        let daemon = NewDaemon::new("Critic", "Be critical").into_daemon();
        assert!(Uuid::parse_str(&daemon.id).is_ok());

        let daemon = NewDaemon {
            id: Some("critic".to_string()),
            ..NewDaemon::new("Critic", "Be critical")
        }
        .into_daemon();
        assert_eq!(daemon.id, "critic");
    }

    #[test]
    fn test_payload_deserializes_without_span() {
        let payload: SuggestionPayload = serde_json::from_str(
            r##"{"daemon_id":"critic","daemon_name":"Critic","question":"Why?","color":"#fff"}"##,
        )
        .unwrap();
        let draft = payload.into_draft("text".to_string());
        assert_eq!(draft.resolve_span().unwrap(), None);
    }
}
