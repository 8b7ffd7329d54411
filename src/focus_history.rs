//! Navigable history of focused windows.
//!
//! Works like an undo stack: `cursor` is the window currently visited,
//! previous/next walk the stack with wraparound, and focusing a new window
//! while in the middle of the stack discards the entries after the cursor.
//! `last_cursor` remembers the position visited just before the current one
//! so `visit_last` can toggle between the two most recent windows.

use crate::wm_ipc::WindowId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusHistory {
    entries: Vec<WindowId>,
    cursor: usize,
    last_cursor: usize,
    capacity: usize,
}

impl FocusHistory {
    /// Create an empty history holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        FocusHistory {
            entries: Vec::new(),
            cursor: 0,
            last_cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Create a history seeded with the window focused at startup, if any.
    pub fn with_initial(capacity: usize, initial: Option<WindowId>) -> Self {
        let mut history = Self::new(capacity);
        if let Some(id) = initial {
            history.push(id);
        }
        history
    }

    pub fn entries(&self) -> &[WindowId] {
        &self.entries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn last_cursor(&self) -> usize {
        self.last_cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The window at the cursor
    pub fn current(&self) -> Option<WindowId> {
        self.entries.get(self.cursor).copied()
    }

    /// Whether there is anywhere to go besides the current window.
    pub fn can_navigate(&self) -> bool {
        self.entries.len() > 1
    }

    /// Record that `id` gained focus.
    ///
    /// Refocusing the window at the cursor is a no-op.
    pub fn push(&mut self, id: WindowId) {
        if self.entries.is_empty() {
            self.entries.push(id);
            self.cursor = 0;
            self.last_cursor = 0;
            return;
        }
        if self.current() == Some(id) {
            return;
        }

        self.last_cursor = self.cursor;
        self.cursor += 1;
        if self.cursor == self.entries.len() {
            self.entries.push(id);
        } else {
            // Focusing something new mid-stack drops the forward entries
            self.entries[self.cursor] = id;
            self.entries.truncate(self.cursor + 1);
        }

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
            self.cursor = self.cursor.saturating_sub(1);
            self.last_cursor = self.last_cursor.saturating_sub(1);
        }
    }

    /// Step back one entry, wrapping from the oldest to the newest.
    pub fn visit_previous(&mut self) -> Option<WindowId> {
        if self.entries.is_empty() {
            return None;
        }

        self.last_cursor = self.cursor;
        self.cursor = if self.cursor == 0 {
            self.entries.len() - 1
        } else {
            self.cursor - 1
        };

        self.current()
    }

    /// Step forward one entry, wrapping from the newest to the oldest.
    pub fn visit_next(&mut self) -> Option<WindowId> {
        if self.entries.is_empty() {
            return None;
        }

        self.last_cursor = self.cursor;
        self.cursor = (self.cursor + 1) % self.entries.len();

        self.current()
    }

    /// Jump to the previously visited entry.
    ///
    /// Swaps `cursor` and `last_cursor`, so repeated calls alternate between
    /// the two most recent windows.
    pub fn visit_last(&mut self) -> Option<WindowId> {
        let id = self.entries.get(self.last_cursor).copied()?;
        std::mem::swap(&mut self.cursor, &mut self.last_cursor);
        Some(id)
    }

    /// Forget every occurrence of a (closed) window.
    pub fn remove(&mut self, id: WindowId) {
        if !self.entries.contains(&id) {
            return;
        }

        self.retain_indices(|entries, i| entries[i] != id);
        // Removal can leave equal neighbours, e.g. [a, b, a] -> [a, a].
        // Keep the newest of each run.
        self.retain_indices(|entries, i| i + 1 == entries.len() || entries[i] != entries[i + 1]);
    }

    /// Keep only the most recent occurrence of every window.
    ///
    /// The cursors keep pointing at the same windows they did before.
    pub fn dedupe(&mut self) {
        if !self.can_navigate() {
            return;
        }

        let current = self.entries[self.cursor];
        let last = self.entries[self.last_cursor];

        let mut seen = std::collections::HashSet::new();
        let mut newest_first: Vec<WindowId> = self
            .entries
            .iter()
            .rev()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        newest_first.reverse();
        self.entries = newest_first;

        self.cursor = self.position_of(current);
        self.last_cursor = self.position_of(last);
    }

    fn position_of(&self, id: WindowId) -> usize {
        self.entries.iter().position(|&e| e == id).unwrap_or(0)
    }

    /// Keep the entries for which `keep(entries, index)` holds, moving each
    /// cursor down by the number of dropped entries before it. A cursor whose
    /// own entry is dropped lands on the next kept entry (clamped to the end).
    fn retain_indices(&mut self, keep: impl Fn(&[WindowId], usize) -> bool) {
        let kept: Vec<bool> = (0..self.entries.len())
            .map(|i| keep(&self.entries, i))
            .collect();

        let shift = |position: usize| kept[..position].iter().filter(|k| !**k).count();
        let cursor = self.cursor - shift(self.cursor);
        let last_cursor = self.last_cursor - shift(self.last_cursor);

        let mut flags = kept.iter();
        self.entries.retain(|_| flags.next().copied().unwrap_or(false));

        let max = self.entries.len().saturating_sub(1);
        self.cursor = cursor.min(max);
        self.last_cursor = last_cursor.min(max);
    }
}
