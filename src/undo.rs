//! Undo stack of previously observed live-window sets
//!
//! Lives for the lifetime of the process and is never persisted.
//! The reconciler pushes before it mutates anything; popping is an explicit,
//! separate operation.

use chrono::{DateTime, Local};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::types::WindowDescriptor;

/// Live-window set observed right before a reconciliation
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub captured_at: DateTime<Local>,
    pub windows: Vec<WindowDescriptor>,
}

/// Bounded LIFO of [`UndoEntry`], shareable by reference
#[derive(Debug)]
pub struct UndoStack {
    entries: Mutex<Vec<UndoEntry>>,
    depth: usize,
}

impl UndoStack {
    pub fn new(depth: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            depth: depth.max(1),
        }
    }

    /// Recover the guard even if a previous holder panicked; the Vec is always valid
    fn lock(&self) -> MutexGuard<'_, Vec<UndoEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, windows: Vec<WindowDescriptor>) {
        self.push_entry(UndoEntry {
            captured_at: Local::now(),
            windows,
        });
    }

    /// Put back an entry as-is, e.g. after an undo that could not start
    pub fn push_entry(&self, entry: UndoEntry) {
        let mut entries = self.lock();
        entries.push(entry);
        if entries.len() > self.depth {
            let dropped = entries.len() - self.depth;
            entries.drain(..dropped);
            warn!(depth = self.depth, dropped, "Undo stack full, discarded oldest entries");
        }
        debug!(entries = entries.len(), "Pushed undo entry");
    }

    /// Most recent entry, or `None` when there is nothing to undo
    pub fn pop(&self) -> Option<UndoEntry> {
        self.lock().pop()
    }

    pub fn peek_captured_at(&self) -> Option<DateTime<Local>> {
        self.lock().last().map(|entry| entry.captured_at)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(crate::constants::undo::DEFAULT_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Rect, WindowHandle};

    fn window(path: &str) -> WindowDescriptor {
        WindowDescriptor::new(path, WindowHandle(1), Rect::new(0, 0, 100, 100))
    }

    #[test]
    fn test_pop_empty() {
        let stack = UndoStack::default();
        assert!(stack.is_empty());
        assert!(stack.pop().is_none());
        assert!(stack.peek_captured_at().is_none());
    }

    #[test]
    fn test_pop_returns_most_recent_first() {
        let stack = UndoStack::new(10);
        stack.push(vec![window("/a")]);
        stack.push(vec![window("/b"), window("/c")]);
        assert_eq!(stack.len(), 2);

        let latest = stack.pop().unwrap();
        assert_eq!(latest.windows.len(), 2);
        assert_eq!(latest.windows[0].path, "/b");

        let older = stack.pop().unwrap();
        assert_eq!(older.windows[0].path, "/a");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_depth_drops_oldest() {
        let stack = UndoStack::new(2);
        stack.push(vec![window("/1")]);
        stack.push(vec![window("/2")]);
        stack.push(vec![window("/3")]);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().windows[0].path, "/3");
        assert_eq!(stack.pop().unwrap().windows[0].path, "/2");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_empty_snapshot_is_still_an_entry() {
        let stack = UndoStack::new(5);
        stack.push(Vec::new());
        assert_eq!(stack.len(), 1);
        assert!(stack.pop().unwrap().windows.is_empty());
    }
}
