//! Background execution of sorts.
//!
//! A sort runs as a Tokio task that first waits for the previously submitted
//! sort to end, then for exclusive access to the sheet's rows, and then does
//! the CPU-bound work on the blocking pool. The place in that chain is taken
//! inside [`SortExecutor::submit`], so sorts touch the rows in submission
//! order on any runtime flavor. A sort cancelled while in line hands its
//! place to its successor. The ordering a sort uses is frozen at
//! submission time; later ordering changes only affect later sorts.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{OverlapPolicy, SortConfig};
use crate::error::{ComparisonError, Result, SortError};
use crate::ordering::ResolvedOrdering;
use crate::progress::Progress;
use crate::sheet::{RowState, SharedRows, SheetSource};
use crate::undo::RowSnapshot;

use super::keys::{compare_keys, sort_key};
use super::utils::{SortInterrupt, apply_permutation, try_stable_sort_indices};

/// How a sort ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    /// Every row is in its final position.
    Completed { rows: usize },
    /// The sort was cancelled; rows keep their last consistent order.
    Cancelled { processed: usize, total: usize },
    /// Two values could not be ordered; rows keep their previous order.
    Incomplete { error: ComparisonError },
    /// The sheet's rows are not loaded yet.
    Skipped,
}

impl SortOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SortOutcome::Completed { .. })
    }

    /// User-facing warning for outcomes that left the sheet unsorted.
    pub fn warning(&self) -> Option<String> {
        match self {
            SortOutcome::Incomplete { error } => Some(format!(
                "sort incomplete: {error}; change the column type and sort again"
            )),
            _ => None,
        }
    }
}

struct ActiveSort {
    id: u64,
    cancel: CancellationToken,
}

type ActiveSorts = Arc<Mutex<Vec<ActiveSort>>>;

/// Undo snapshots still waiting for rows, keyed by the id of the sort they
/// were submitted with.
type PendingSnapshots<R> = Arc<Mutex<Vec<(u64, RowSnapshot<R>)>>>;

/// Runs sorts for one sheet and enforces its [`OverlapPolicy`].
pub struct SortExecutor<S: SheetSource> {
    sheet: Arc<S>,
    config: SortConfig,
    active: ActiveSorts,
    /// Completion signal of the most recently submitted sort.
    tail: Mutex<Option<oneshot::Receiver<()>>>,
    pending: PendingSnapshots<S::Row>,
    next_id: AtomicU64,
}

impl<S: SheetSource> fmt::Debug for SortExecutor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortExecutor")
            .field("sheet", &self.sheet.sheet_name())
            .field("overlap_policy", &self.config.overlap_policy)
            .field("active", &self.active_count())
            .finish()
    }
}

impl<S: SheetSource> SortExecutor<S> {
    pub fn new(sheet: Arc<S>, config: SortConfig) -> Self {
        Self {
            sheet,
            config,
            active: Arc::new(Mutex::new(Vec::new())),
            tail: Mutex::new(None),
            pending: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Number of submitted sorts that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_busy(&self) -> bool {
        self.active_count() > 0
    }

    /// Cancel every submitted sort that has not finished.
    pub fn cancel_all(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        for sort in active.iter() {
            sort.cancel.cancel();
        }
    }

    /// Start sorting the sheet's rows by `ordering` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, ordering: Arc<ResolvedOrdering<S::Row>>) -> Result<SortHandle> {
        self.submit_with_snapshot(ordering, None)
    }

    /// Like [`submit`](Self::submit), and fill `snapshot` with the rows as
    /// they are just before this sort reorders them. If this sort is cancelled
    /// before it gets the rows, the next sort to get them fills it instead.
    pub fn submit_with_snapshot(
        &self,
        ordering: Arc<ResolvedOrdering<S::Row>>,
        snapshot: Option<RowSnapshot<S::Row>>,
    ) -> Result<SortHandle> {
        let sheet_name = self.sheet.sheet_name().to_string();
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let cancel = CancellationToken::new();

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            match self.config.overlap_policy {
                OverlapPolicy::Reject if !active.is_empty() => {
                    debug!(
                        target: "sort::exec",
                        sheet = %sheet_name,
                        in_flight = active.len(),
                        "rejecting overlapping sort"
                    );
                    return Err(SortError::SortInFlight(sheet_name));
                }
                OverlapPolicy::Preempt => {
                    for previous in active.iter() {
                        debug!(
                            target: "sort::exec",
                            sheet = %sheet_name,
                            preempted = previous.id,
                            by = id,
                            "preempting in-flight sort"
                        );
                        previous.cancel.cancel();
                    }
                }
                OverlapPolicy::Queue | OverlapPolicy::Reject => {}
            }
            active.push(ActiveSort {
                id,
                cancel: cancel.clone(),
            });
        }

        let (done, next_tail) = oneshot::channel();
        let predecessor = self
            .tail
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next_tail);
        if let Some(snapshot) = snapshot {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((id, snapshot));
        }

        let progress = Progress::new();
        let job = SortJob {
            id,
            sheet_name: sheet_name.clone(),
            rows: self.sheet.rows(),
            ordering,
            pending: Arc::clone(&self.pending),
            progress: progress.clone(),
            cancel: cancel.clone(),
            label: self.config.progress_label.clone(),
            active: Arc::clone(&self.active),
            predecessor,
            done,
        };

        debug!(
            target: "sort::exec",
            sheet = %sheet_name,
            sort_id = id,
            keys = job.ordering.len(),
            "sort submitted"
        );

        let task = tokio::spawn(job.run());

        Ok(SortHandle {
            id,
            sheet_name,
            progress,
            cancel,
            task,
        })
    }
}

struct SortJob<R> {
    id: u64,
    sheet_name: String,
    rows: SharedRows<R>,
    ordering: Arc<ResolvedOrdering<R>>,
    pending: PendingSnapshots<R>,
    progress: Progress,
    cancel: CancellationToken,
    label: String,
    active: ActiveSorts,
    predecessor: Option<oneshot::Receiver<()>>,
    /// Dropped when this job ends, which releases the next one.
    done: oneshot::Sender<()>,
}

impl<R: Clone + Send + Sync + 'static> SortJob<R> {
    async fn run(self) -> Result<SortOutcome> {
        let SortJob {
            id,
            sheet_name,
            rows,
            ordering,
            pending,
            progress,
            cancel,
            label,
            active,
            mut predecessor,
            done,
        } = self;

        let acquire = async {
            if let Some(previous) = predecessor.as_mut() {
                // Err only means the previous job is gone, which is all we wait for.
                let _ = previous.await;
            }
            predecessor = None;
            Arc::clone(&rows).lock_owned().await
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                drop(progress.scope(&label, 0));
                Ok(SortOutcome::Cancelled { processed: 0, total: 0 })
            }
            guard = acquire => {
                let blocking_cancel = cancel.clone();
                let blocking_progress = progress.clone();
                tokio::task::spawn_blocking(move || {
                    let mut guard = guard;
                    sort_rows(
                        id,
                        &mut guard,
                        &ordering,
                        &pending,
                        &blocking_progress,
                        &label,
                        &blocking_cancel,
                    )
                })
                .await
                .map_err(|e| SortError::Internal(format!("sort task failed: {e}")))
            }
        };

        active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sort| sort.id != id);
        match predecessor {
            // Cancelled while still in line: keep the successor behind our predecessor.
            Some(previous) => {
                tokio::spawn(async move {
                    let _ = previous.await;
                    drop(done);
                });
            }
            None => drop(done),
        }

        match &result {
            Ok(SortOutcome::Completed { rows }) => info!(
                target: "sort::exec",
                sheet = %sheet_name,
                sort_id = id,
                rows,
                "sort completed"
            ),
            Ok(SortOutcome::Cancelled { processed, total }) => info!(
                target: "sort::exec",
                sheet = %sheet_name,
                sort_id = id,
                processed,
                total,
                "sort cancelled"
            ),
            Ok(SortOutcome::Incomplete { error }) => warn!(
                target: "sort::exec",
                sheet = %sheet_name,
                sort_id = id,
                column = %error.column,
                "sort incomplete due to incomparable values: {error}; change column type"
            ),
            Ok(SortOutcome::Skipped) => debug!(
                target: "sort::exec",
                sheet = %sheet_name,
                sort_id = id,
                "rows not loaded; nothing to sort"
            ),
            Err(err) => error!(
                target: "sort::exec",
                sheet = %sheet_name,
                sort_id = id,
                "{err}"
            ),
        }

        result
    }
}

/// Sort `state` in place. Runs on the blocking pool with the rows locked.
fn sort_rows<R: Clone>(
    id: u64,
    state: &mut RowState<R>,
    ordering: &ResolvedOrdering<R>,
    pending: &Mutex<Vec<(u64, RowSnapshot<R>)>>,
    progress: &Progress,
    label: &str,
    cancel: &CancellationToken,
) -> SortOutcome {
    let Some(rows) = state.loaded_mut() else {
        return SortOutcome::Skipped;
    };
    capture_snapshots(pending, id, rows);

    let total = rows.len();
    let scope = progress.scope(label, total);

    let mut keys = Vec::with_capacity(total);
    for row in rows.iter() {
        if cancel.is_cancelled() {
            return SortOutcome::Cancelled {
                processed: scope.processed(),
                total,
            };
        }
        keys.push(sort_key(row, ordering));
        scope.add(1);
    }

    let order = match try_stable_sort_indices(
        total,
        |a, b| compare_keys(&keys[a], &keys[b], ordering),
        cancel,
    ) {
        Ok(order) => order,
        Err(SortInterrupt::Cancelled) => {
            return SortOutcome::Cancelled {
                processed: total,
                total,
            };
        }
        Err(SortInterrupt::Failed(error)) => return SortOutcome::Incomplete { error },
    };

    apply_permutation(rows, &order);
    SortOutcome::Completed { rows: total }
}

/// Fill the pending snapshots of this sort and of every earlier one. Sorts
/// take the rows in submission order, so earlier sorts have all ended.
fn capture_snapshots<R: Clone>(pending: &Mutex<Vec<(u64, RowSnapshot<R>)>>, id: u64, rows: &[R]) {
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|(owner, snapshot)| {
            if *owner > id {
                return true;
            }
            snapshot.capture(rows);
            false
        });
}

/// Handle to a submitted sort.
pub struct SortHandle {
    id: u64,
    sheet_name: String,
    progress: Progress,
    cancel: CancellationToken,
    task: JoinHandle<Result<SortOutcome>>,
}

impl fmt::Debug for SortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortHandle")
            .field("id", &self.id)
            .field("sheet", &self.sheet_name)
            .field("progress", &self.progress.snapshot())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl SortHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Ask the sort to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the sort to end. Incomparable values are an
    /// [`SortOutcome::Incomplete`] outcome, not an error.
    pub async fn wait(self) -> Result<SortOutcome> {
        self.task
            .await
            .map_err(|e| SortError::Internal(format!("sort task failed: {e}")))?
    }
}
