//! Undo registration for ordering changes.
//!
//! The ordering manager records what it needs to revert a change before it
//! mutates anything; replaying the batch is
//! [`OrderingManager::undo`](crate::ordering::OrderingManager::undo).

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::ordering::OrderingEntry;

/// One inverse step of an ordering change.
pub enum UndoAction<R> {
    /// Put the previous ordering back.
    RestoreOrdering(Vec<OrderingEntry<R>>),
    /// Re-sort with whatever ordering is current when the action is replayed.
    Resort,
    /// Put the row order captured by the change's sort back in place.
    RestoreRows(RowSnapshot<R>),
}

/// Row order captured under the row lock by the first sort, at or after the
/// change it belongs to, that reaches loaded rows.
///
/// Empty while no such sort has run, in which case the rows are untouched.
pub struct RowSnapshot<R> {
    rows: Arc<OnceLock<Vec<R>>>,
}

impl<R> RowSnapshot<R> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(OnceLock::new()),
        }
    }

    /// Record `rows`. Only the first capture is kept.
    pub fn capture(&self, rows: &[R])
    where
        R: Clone,
    {
        let _ = self.rows.set(rows.to_vec());
    }

    pub fn rows(&self) -> Option<&[R]> {
        self.rows.get().map(Vec::as_slice)
    }

    pub fn is_captured(&self) -> bool {
        self.rows.get().is_some()
    }
}

impl<R> Default for RowSnapshot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for RowSnapshot<R> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<R> fmt::Debug for RowSnapshot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowSnapshot")
            .field("rows", &self.rows().map(<[R]>::len))
            .finish()
    }
}

impl<R> fmt::Debug for UndoAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndoAction::RestoreOrdering(entries) => {
                f.debug_tuple("RestoreOrdering").field(entries).finish()
            }
            UndoAction::Resort => f.write_str("Resort"),
            UndoAction::RestoreRows(snapshot) => {
                f.debug_tuple("RestoreRows").field(snapshot).finish()
            }
        }
    }
}

/// Actions recorded for a single user-visible change, in registration order.
#[derive(Debug)]
pub struct UndoBatch<R> {
    pub label: String,
    pub actions: Vec<UndoAction<R>>,
}

impl<R> UndoBatch<R> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, action: UndoAction<R>) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Sink for undo batches.
pub trait UndoLog<R>: Send + Sync {
    fn record(&self, batch: UndoBatch<R>);
}

/// Last-in first-out in-memory undo log.
pub struct UndoStack<R> {
    batches: Mutex<Vec<UndoBatch<R>>>,
}

impl<R> Default for UndoStack<R> {
    fn default() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
        }
    }
}

impl<R> fmt::Debug for UndoStack<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoStack").field("depth", &self.len()).finish()
    }
}

impl<R> UndoStack<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&self) -> Option<UndoBatch<R>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
    }

    pub fn len(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Send + Sync> UndoLog<R> for UndoStack<R> {
    fn record(&self, batch: UndoBatch<R>) {
        if batch.is_empty() {
            return;
        }
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_is_lifo_and_skips_empty_batches() {
        let stack = UndoStack::<u32>::new();
        stack.record(UndoBatch::new("empty"));
        assert!(stack.is_empty());

        let mut first = UndoBatch::new("first");
        first.push(UndoAction::Resort);
        stack.record(first);

        let mut second = UndoBatch::new("second");
        second.push(UndoAction::RestoreRows(RowSnapshot::new()));
        stack.record(second);

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().label, "second");
        assert_eq!(stack.pop().unwrap().label, "first");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_snapshot_keeps_first_capture() {
        let snapshot = RowSnapshot::<u32>::new();
        let shared = snapshot.clone();
        assert!(!snapshot.is_captured());

        shared.capture(&[3, 1, 2]);
        snapshot.capture(&[9]);

        assert_eq!(snapshot.rows(), Some(&[3, 1, 2][..]));
    }
}
