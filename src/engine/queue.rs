//! Ordered suggestion queue with a selection pointer
//!
//! Suggestions are kept in arrival order and addressed by [`SuggestionId`].
//! The selection, when set, always names a member of the queue.

use crate::types::{Suggestion, SuggestionId};

/// Suggestions in arrival order
#[derive(Debug, Default, Clone)]
pub struct SuggestionQueue {
    items: Vec<Suggestion>,
    selected: Option<SuggestionId>,
}

impl SuggestionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Suggestions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
        self.items.iter()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> Vec<SuggestionId> {
        self.items.iter().map(|s| s.id()).collect()
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.items.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: SuggestionId) -> bool {
        self.index_of(id).is_some()
    }

    /// Position of `id`, if queued
    pub fn index_of(&self, id: SuggestionId) -> Option<usize> {
        self.items.iter().position(|s| s.id() == id)
    }

    /// Member at `index`
    pub fn at(&self, index: usize) -> Option<&Suggestion> {
        self.items.get(index)
    }

    /// Add at the tail. Returns false (and leaves the queue alone) if the id
    /// is already queued.
    pub fn append(&mut self, suggestion: Suggestion) -> bool {
        if self.contains(suggestion.id()) {
            return false;
        }
        self.items.push(suggestion);
        true
    }

    /// Remove `id`, returning its former position and the suggestion.
    ///
    /// Clears the selection if it pointed at the removed member. Absent ids
    /// are a no-op.
    pub fn remove(&mut self, id: SuggestionId) -> Option<(usize, Suggestion)> {
        let index = self.index_of(id)?;
        let removed = self.items.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some((index, removed))
    }

    /// Remove every suggestion authored by `daemon_id`
    pub fn remove_by_daemon(&mut self, daemon_id: &str) -> Vec<Suggestion> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|s| s.daemon_id == daemon_id);
        self.items = kept;
        if let Some(selected) = self.selected {
            if !self.contains(selected) {
                self.selected = None;
            }
        }
        removed
    }

    /// Remove everything, including the selection
    pub fn clear(&mut self) -> Vec<Suggestion> {
        self.selected = None;
        std::mem::take(&mut self.items)
    }

    /// Member after `current`, wrapping at the tail
    ///
    /// `None` when the queue has at most one member or `current` is not queued.
    pub fn next(&self, current: SuggestionId) -> Option<SuggestionId> {
        if self.items.len() <= 1 {
            return None;
        }
        let index = self.index_of(current)?;
        Some(self.items[(index + 1) % self.items.len()].id())
    }

    /// Member before `current`, wrapping at the head
    pub fn previous(&self, current: SuggestionId) -> Option<SuggestionId> {
        if self.items.len() <= 1 {
            return None;
        }
        let index = self.index_of(current)?;
        let len = self.items.len();
        Some(self.items[(index + len - 1) % len].id())
    }

    pub fn selected(&self) -> Option<SuggestionId> {
        self.selected
    }

    pub fn selected_suggestion(&self) -> Option<&Suggestion> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Select `id`; ignored (returns false) if it is not queued
    pub fn select(&mut self, id: SuggestionId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Select the member at `index`, or clear the selection when out of range
    pub fn select_index(&mut self, index: usize) {
        self.selected = self.items.get(index).map(|s| s.id());
    }

    /// Select the head of the queue (or nothing when empty)
    pub fn select_first(&mut self) {
        self.select_index(0);
    }

    /// Mark every member outdated, returning the ids that changed state
    pub fn mark_all_outdated(&mut self) -> Vec<SuggestionId> {
        self.items
            .iter_mut()
            .filter(|s| !s.is_outdated())
            .map(|s| {
                s.mark_outdated();
                s.id()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Daemon;

    fn daemon(id: &str) -> Daemon {
        Daemon {
            id: id.to_string(),
            name: id.to_uppercase(),
            prompt: "p".to_string(),
            examples: vec![],
            guardrails: None,
            color: "#000000".to_string(),
        }
    }

    fn suggestion(id: u64, daemon_id: &str) -> Suggestion {
        Suggestion::new(
            SuggestionId::from_raw(id),
            &daemon(daemon_id),
            format!("Question {}?", id),
            None,
            None,
        )
    }

    fn id(raw: u64) -> SuggestionId {
        SuggestionId::from_raw(raw)
    }

    fn queue_of(ids: &[u64]) -> SuggestionQueue {
        let mut queue = SuggestionQueue::new();
        for raw in ids {
            queue.append(suggestion(*raw, "d"));
        }
        queue
    }

    #[test]
    fn test_append_preserves_order() {
        let queue = queue_of(&[3, 1, 2]);
        assert_eq!(queue.ids(), vec![id(3), id(1), id(2)]);
        assert_eq!(queue.index_of(id(2)), Some(2));
        assert_eq!(queue.index_of(id(9)), None);
    }

    #[test]
    fn test_duplicate_id_not_appended() {
        let mut queue = queue_of(&[1]);
        assert!(!queue.append(suggestion(1, "other")));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(id(1)).unwrap().daemon_id, "d");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut queue = queue_of(&[1, 2]);
        assert!(queue.remove(id(5)).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_clears_selection_of_removed_member() {
        let mut queue = queue_of(&[1, 2, 3]);
        assert!(queue.select(id(2)));
        let (index, removed) = queue.remove(id(2)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(removed.id(), id(2));
        assert_eq!(queue.selected(), None);
        assert_eq!(queue.ids(), vec![id(1), id(3)]);
    }

    #[test]
    fn test_next_previous_wrap() {
        let queue = queue_of(&[1, 2, 3]);
        assert_eq!(queue.next(id(3)), Some(id(1)));
        assert_eq!(queue.previous(id(1)), Some(id(3)));
        assert_eq!(queue.next(id(1)), Some(id(2)));
        assert_eq!(queue.previous(id(2)), Some(id(1)));
    }

    #[test]
    fn test_navigation_noop_for_single_member() {
        let queue = queue_of(&[1]);
        assert_eq!(queue.next(id(1)), None);
        assert_eq!(queue.previous(id(1)), None);
        assert_eq!(SuggestionQueue::new().next(id(1)), None);
    }

    #[test]
    fn test_select_ignores_non_members() {
        let mut queue = queue_of(&[1]);
        assert!(!queue.select(id(7)));
        assert_eq!(queue.selected(), None);
        queue.select_index(4);
        assert_eq!(queue.selected(), None);
        queue.select_first();
        assert_eq!(queue.selected(), Some(id(1)));
    }

    #[test]
    fn test_remove_by_daemon() {
        let mut queue = SuggestionQueue::new();
        queue.append(suggestion(1, "a"));
        queue.append(suggestion(2, "b"));
        queue.append(suggestion(3, "a"));
        queue.select(id(2));

        let removed = queue.remove_by_daemon("a");
        assert_eq!(removed.len(), 2);
        assert_eq!(queue.ids(), vec![id(2)]);
        assert_eq!(queue.selected(), Some(id(2)));

        queue.remove_by_daemon("b");
        assert!(queue.is_empty());
        assert_eq!(queue.selected(), None);
    }

    #[test]
    fn test_mark_all_outdated_reports_changes_once() {
        let mut queue = queue_of(&[1, 2]);
        assert_eq!(queue.mark_all_outdated(), vec![id(1), id(2)]);
        assert!(queue.mark_all_outdated().is_empty());
        assert!(queue.iter().all(|s| s.is_outdated()));
    }
}
