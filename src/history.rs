//! Bounded, in-memory command history with a recall cursor.

use std::collections::VecDeque;

/// Default number of commands kept by a [`HistoryStore`].
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity, insertion-ordered command log.
///
/// Entries are stored oldest-first. Appending to a full store evicts the oldest
/// entry. The recall cursor lives in `0..=len()`; the position `len()` is the
/// "new, empty line" slot that the editor starts from.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            cursor: 0,
        }
    }

    /// Record a command, evicting the oldest one when the store is full.
    ///
    /// The recall cursor is reset to the empty slot after every append.
    pub fn append(&mut self, command: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command.into());
        self.cursor = self.entries.len();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Entries in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the recall cursor one entry towards the oldest command.
    ///
    /// Returns `false` (and leaves the cursor alone) when it is already at the oldest entry.
    pub fn step_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move the recall cursor one entry towards the empty slot.
    ///
    /// Returns `false` when the cursor already sits on the empty slot.
    pub fn step_forward(&mut self) -> bool {
        if self.cursor >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// The entry under the recall cursor, or `""` for the empty slot.
    pub fn recalled(&self) -> &str {
        self.get(self.cursor).unwrap_or("")
    }

    /// Distinct entries, keeping the first (oldest) occurrence of each.
    pub fn unique_entries(&self) -> Vec<String> {
        let mut unique: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !unique.contains(entry) {
                unique.push(entry.clone());
            }
        }
        unique
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_overflow_evicts_oldest_for_any_capacity() {
        for capacity in [1, 2, 3, 10, DEFAULT_CAPACITY] {
            let mut history = HistoryStore::new(capacity);
            for i in 0..=capacity {
                history.append(format!("cmd {i}"));
            }
            assert_eq!(history.len(), capacity);
            assert_eq!(history.get(0), Some("cmd 1"));
            assert_eq!(history.get(capacity - 1), Some(format!("cmd {capacity}").as_str()));
        }
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = HistoryStore::new(0);
        history.append("ls");
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_huge_capacity_grows_on_demand() {
        let mut history = HistoryStore::new(usize::MAX);
        assert_eq!(history.capacity(), usize::MAX);
        for i in 0..=DEFAULT_CAPACITY {
            history.append(format!("cmd {i}"));
        }
        assert_eq!(history.len(), DEFAULT_CAPACITY + 1);
        assert_eq!(history.get(0), Some("cmd 0"));
    }

    #[test]
    fn test_append_resets_cursor_to_empty_slot() {
        let mut history = HistoryStore::new(5);
        history.append("ls");
        history.append("pwd");
        assert!(history.step_back());
        assert!(history.step_back());
        assert_eq!(history.recalled(), "ls");

        history.append("whoami");
        assert_eq!(history.cursor(), 3);
        assert_eq!(history.recalled(), "");
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut history = HistoryStore::new(5);
        history.append("a");
        history.append("b");

        assert!(!history.step_forward());
        assert!(history.step_back());
        assert!(history.step_back());
        assert!(!history.step_back());
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.recalled(), "a");

        assert!(history.step_forward());
        assert!(history.step_forward());
        assert!(!history.step_forward());
        assert_eq!(history.recalled(), "");
    }

    #[test]
    fn test_unique_entries_keep_first_occurrence() {
        let mut history = HistoryStore::new(10);
        for cmd in ["ls", "git status", "ls", "pwd", "git status"] {
            history.append(cmd);
        }
        assert_eq!(history.unique_entries(), vec!["ls", "git status", "pwd"]);
    }
}
