//! Daemon catalog
//!
//! The engine consumes the catalog through [`DaemonCatalog`]. The backend
//! server owns an [`InMemoryCatalog`] seeded with the built-in daemons.

use crate::error::CollaboratorError;
use crate::types::{Daemon, DaemonId, Example, NewDaemon};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Ids of the daemons that ship with the service and cannot be deleted
pub const BUILTIN_DAEMON_IDS: [&str; 3] = ["devil_advocate", "grammar_enthusiast", "clarity_coach"];

/// True for ids in the protected built-in set
pub fn is_builtin(id: &str) -> bool {
    BUILTIN_DAEMON_IDS.contains(&id)
}

/// CRUD access to daemon definitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DaemonCatalog: Send + Sync {
    /// All daemons in catalog order
    async fn list(&self) -> Result<Vec<Daemon>, CollaboratorError>;

    /// Create a daemon; fails with `Validation` on blank name or prompt
    async fn create(&self, new: NewDaemon) -> Result<Daemon, CollaboratorError>;

    /// Delete a daemon, returning the removed definition
    async fn delete(&self, id: &str) -> Result<Daemon, CollaboratorError>;
}

/// Catalog held in process memory (lost on restart)
#[derive(Clone)]
pub struct InMemoryCatalog {
    daemons: Arc<RwLock<Vec<Daemon>>>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl InMemoryCatalog {
    /// Empty catalog
    pub fn empty() -> Self {
        Self {
            daemons: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Catalog seeded with the built-in daemons
    pub fn with_builtins() -> Self {
        Self {
            daemons: Arc::new(RwLock::new(builtin_daemons())),
        }
    }

    /// Look up a daemon by id
    pub async fn get(&self, id: &str) -> Option<Daemon> {
        let daemons = self.daemons.read().await;
        daemons.iter().find(|d| d.id == id).cloned()
    }

    /// Number of daemons
    pub async fn len(&self) -> usize {
        self.daemons.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.daemons.read().await.is_empty()
    }
}

#[async_trait]
impl DaemonCatalog for InMemoryCatalog {
    async fn list(&self) -> Result<Vec<Daemon>, CollaboratorError> {
        Ok(self.daemons.read().await.clone())
    }

    async fn create(&self, new: NewDaemon) -> Result<Daemon, CollaboratorError> {
        new.validate()?;
        let daemon = new.into_daemon();

        let mut daemons = self.daemons.write().await;
        // Re-adding an existing id replaces it in place
        match daemons.iter_mut().find(|d| d.id == daemon.id) {
            Some(existing) => {
                debug!("Replacing daemon {}", daemon.id);
                *existing = daemon.clone();
            }
            None => daemons.push(daemon.clone()),
        }

        info!("Added daemon {} ({})", daemon.name, daemon.id);
        Ok(daemon)
    }

    async fn delete(&self, id: &str) -> Result<Daemon, CollaboratorError> {
        let mut daemons = self.daemons.write().await;
        let position = daemons
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CollaboratorError::NotFound(id.to_string()))?;

        if is_builtin(id) {
            return Err(CollaboratorError::Protected(id.to_string()));
        }

        let removed = daemons.remove(position);
        info!("Deleted daemon {} ({})", removed.name, removed.id);
        Ok(removed)
    }
}

fn daemon(
    id: &str,
    name: &str,
    prompt: &str,
    example: (&str, &str),
    guardrails: &str,
    color: &str,
) -> Daemon {
    Daemon {
        id: DaemonId::from(id),
        name: name.to_string(),
        prompt: prompt.to_string(),
        examples: vec![Example {
            user: example.0.to_string(),
            assistant: example.1.to_string(),
        }],
        guardrails: Some(guardrails.to_string()),
        color: color.to_string(),
    }
}

/// The daemons every catalog starts with
pub fn builtin_daemons() -> Vec<Daemon> {
    vec![
        daemon(
            "devil_advocate",
            "Devil's Advocate",
            "You are a devil's advocate AI that questions assertions and asks for evidence. \
             Challenge claims constructively and point out potential counterarguments.",
            (
                "LLMs are always unreliable.",
                "Is this claim too absolute? Are there specific contexts where LLMs might be more reliable?",
            ),
            "Stay polite and constructive. Ask only one pointed question. \
             Focus on evidence and logical reasoning.",
            "#e74c3c",
        ),
        daemon(
            "grammar_enthusiast",
            "Grammar Enthusiast",
            "You are a grammar and style enthusiast who helps improve writing mechanics, \
             sentence structure, and clarity. Focus on specific grammatical issues and style improvements.",
            (
                "The data shows that it's results are promising.",
                "Should 'it's' be 'its' here? Also, consider if 'the results' would be clearer than 'it's results'.",
            ),
            "Focus on specific grammar, punctuation, or style issues. \
             Be helpful and educational, not pedantic.",
            "#9b59b6",
        ),
        daemon(
            "clarity_coach",
            "Clarity Coach",
            "You help improve writing clarity by identifying confusing, vague, or unnecessarily \
             complex passages. Suggest specific ways to make ideas clearer.",
            (
                "The implementation of the solution was done in a way that was effective.",
                "Could you be more specific about what was implemented and how it was effective?",
            ),
            "Focus on specific clarity issues. Suggest concrete improvements rather than general advice.",
            "#3498db",
        ),
    ]
}
