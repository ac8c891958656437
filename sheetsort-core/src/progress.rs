//! Progress counters shared between a running sort and whoever renders it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Observable progress of one long-running operation.
///
/// Cloning is cheap; every clone observes the same counters.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    inner: Arc<ProgressInner>,
}

#[derive(Debug, Default)]
struct ProgressInner {
    label: RwLock<String>,
    processed: AtomicUsize,
    total: AtomicUsize,
    finished: AtomicBool,
}

/// Point-in-time copy of a [`Progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub label: String,
    pub processed: usize,
    pub total: usize,
    pub finished: bool,
}

impl ProgressSnapshot {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return if self.finished { 1.0 } else { 0.0 };
        }
        (self.processed as f64 / self.total as f64).min(1.0)
    }
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope that counts towards `total`. The progress is marked
    /// finished when the scope is dropped.
    pub fn scope(&self, label: &str, total: usize) -> ProgressScope {
        *self
            .inner
            .label
            .write()
            .unwrap_or_else(PoisonError::into_inner) = label.to_string();
        self.inner.processed.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
        self.inner.finished.store(false, Ordering::Release);

        ProgressScope {
            progress: self.clone(),
        }
    }

    pub fn processed(&self) -> usize {
        self.inner.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.inner.total.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            label: self
                .inner
                .label
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            processed: self.processed(),
            total: self.total(),
            finished: self.is_finished(),
        }
    }
}

/// Guard returned by [`Progress::scope`].
#[derive(Debug)]
pub struct ProgressScope {
    progress: Progress,
}

impl ProgressScope {
    pub fn add(&self, units: usize) {
        self.progress
            .inner
            .processed
            .fetch_add(units, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.progress.processed()
    }
}

impl Drop for ProgressScope {
    fn drop(&mut self) {
        self.progress.inner.finished.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_counts_and_closes() {
        let progress = Progress::new();
        {
            let scope = progress.scope("sorting", 4);
            scope.add(1);
            scope.add(2);
            let snap = progress.snapshot();
            assert_eq!(snap.label, "sorting");
            assert_eq!(snap.processed, 3);
            assert_eq!(snap.total, 4);
            assert!(!snap.finished);
            assert_eq!(snap.fraction(), 0.75);
        }
        assert!(progress.is_finished());
    }

    #[test]
    fn test_empty_total_reports_complete_once_finished() {
        let progress = Progress::new();
        drop(progress.scope("sorting", 0));
        assert_eq!(progress.snapshot().fraction(), 1.0);
    }
}
