//! Document text buffer
//!
//! Rope-backed text with character indexing. Every change bumps a revision
//! counter so suggestion snapshots can be compared against the live text
//! without diffing.

use crate::error::Result;
use ropey::Rope;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mutable document edited by the user and rewritten by applied suggestions
#[derive(Debug, Clone)]
pub struct Document {
    content: Rope,
    revision: u64,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

impl Document {
    /// Create an in-memory document
    pub fn new(text: &str) -> Self {
        Self {
            content: Rope::from_str(text),
            revision: 0,
            path: None,
            dirty: false,
        }
    }

    /// Load file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let text = fs::read_to_string(&path)?;
        debug!("Loaded {} ({} chars)", path.display(), text.chars().count());

        Ok(Self {
            content: Rope::from_str(&text),
            revision: 0,
            path: Some(path),
            dirty: false,
        })
    }

    /// Save buffer to its file
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(crate::error::DaemonError::Other(
                "Document has no file path".to_string(),
            ));
        };
        self.save_as(path)
    }

    /// Save buffer to `path` and remember it
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        fs::write(&path, self.content.to_string())?;
        debug!("Saved {} (revision {})", path.display(), self.revision);
        self.path = Some(path);
        self.dirty = false;
        Ok(())
    }

    /// Full text
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// Length in characters
    pub fn len_chars(&self) -> usize {
        self.content.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.content.len_chars() == 0
    }

    /// Monotonic change counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether buffer has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True if `text` equals the current content
    pub fn matches(&self, text: &str) -> bool {
        self.content.len_bytes() == text.len() && self.content == text
    }

    /// Characters in `[start, end)`, clamped to the current length
    pub fn slice_clamped(&self, start: usize, end: usize) -> String {
        let len = self.content.len_chars();
        let end = end.min(len);
        let start = start.min(end);
        self.content.slice(start..end).to_string()
    }

    /// Replace the whole text (user edit or applied rewrite)
    pub fn set_text(&mut self, text: &str) {
        if self.matches(text) {
            return;
        }
        self.content = Rope::from_str(text);
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }
}
