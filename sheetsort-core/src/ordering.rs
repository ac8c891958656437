//! Ordering manager: the per-sheet list of sort columns.
//!
//! Entries are kept as supplied (handles or names). Names are resolved to
//! handles once per ordering change and the result is cached until the next
//! change, so per-row comparisons never look a column up again.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::column::{ColumnHandle, ColumnRef};
use crate::config::{OverlapPolicy, SortConfig};
use crate::error::{Result, SortError};
use crate::sheet::SheetSource;
use crate::sorting::{SortExecutor, SortHandle};
use crate::undo::{RowSnapshot, UndoAction, UndoBatch, UndoLog};

/// One `(column, direction)` pair of an ordering.
pub struct OrderingEntry<R> {
    pub column: ColumnRef<R>,
    pub descending: bool,
}

impl<R> OrderingEntry<R> {
    pub fn new(column: impl Into<ColumnRef<R>>, descending: bool) -> Self {
        Self {
            column: column.into(),
            descending,
        }
    }
}

impl<R> Clone for OrderingEntry<R> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            descending: self.descending,
        }
    }
}

impl<R> fmt::Debug for OrderingEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingEntry")
            .field("column", &self.column)
            .field("descending", &self.descending)
            .finish()
    }
}

/// An ordering entry whose column has been resolved to a live handle.
pub struct ResolvedEntry<R> {
    pub column: ColumnHandle<R>,
    pub descending: bool,
}

impl<R> Clone for ResolvedEntry<R> {
    fn clone(&self) -> Self {
        Self {
            column: Arc::clone(&self.column),
            descending: self.descending,
        }
    }
}

impl<R> fmt::Debug for ResolvedEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEntry")
            .field("column", &self.column.name())
            .field("id", &self.column.id())
            .field("descending", &self.descending)
            .finish()
    }
}

pub type ResolvedOrdering<R> = Vec<ResolvedEntry<R>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingMode {
    /// Discard the current ordering first. No columns means "clear".
    Replace,
    /// Add the columns after the current ordering as tie-breakers.
    Append,
}

/// Owns a sheet's ordering and triggers re-sorts when it changes.
pub struct OrderingManager<S: SheetSource> {
    sheet: Arc<S>,
    config: SortConfig,
    entries: Vec<OrderingEntry<S::Row>>,
    resolved: Option<Arc<ResolvedOrdering<S::Row>>>,
    undo_log: Option<Arc<dyn UndoLog<S::Row>>>,
    executor: SortExecutor<S>,
}

impl<S: SheetSource> fmt::Debug for OrderingManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingManager")
            .field("sheet", &self.sheet.sheet_name())
            .field("entries", &self.entries)
            .field("resolved_cached", &self.resolved.is_some())
            .field("undo_log", &self.undo_log.is_some())
            .field("executor", &self.executor)
            .finish()
    }
}

impl<S: SheetSource> OrderingManager<S> {
    pub fn new(sheet: Arc<S>, config: SortConfig) -> Self {
        let executor = SortExecutor::new(Arc::clone(&sheet), config.clone());
        Self {
            sheet,
            config,
            entries: Vec::new(),
            resolved: None,
            undo_log: None,
            executor,
        }
    }

    pub fn with_undo_log(mut self, undo_log: Arc<dyn UndoLog<S::Row>>) -> Self {
        self.undo_log = Some(undo_log);
        self
    }

    pub fn sheet(&self) -> &Arc<S> {
        &self.sheet
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn executor(&self) -> &SortExecutor<S> {
        &self.executor
    }

    /// The raw ordering, primary key first.
    pub fn entries(&self) -> &[OrderingEntry<S::Row>] {
        &self.entries
    }

    pub fn is_ordered(&self) -> bool {
        !self.entries.is_empty()
    }

    /// The ordering with every column resolved against the sheet's current
    /// columns. Cached until the ordering changes.
    pub fn resolved_ordering(&mut self) -> Result<Arc<ResolvedOrdering<S::Row>>> {
        if let Some(resolved) = &self.resolved {
            return Ok(Arc::clone(resolved));
        }

        let resolved = Arc::new(self.resolve(&self.entries)?);
        self.resolved = Some(Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Change the ordering and re-sort.
    ///
    /// `Replace` with no columns clears the ordering; `Append` with no
    /// columns is rejected. Columns are resolved before anything changes, so
    /// a missing or ambiguous name leaves the manager untouched. Returns the
    /// handle of the triggered sort, if any.
    pub async fn set_ordering<I>(
        &mut self,
        columns: I,
        descending: bool,
        mode: OrderingMode,
    ) -> Result<Option<SortHandle>>
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef<S::Row>>,
    {
        let columns: Vec<ColumnRef<S::Row>> = columns.into_iter().map(Into::into).collect();
        if mode == OrderingMode::Append && columns.is_empty() {
            return Err(SortError::EmptyAppend);
        }
        if self.config.overlap_policy == OverlapPolicy::Reject && self.executor.is_busy() {
            return Err(SortError::SortInFlight(self.sheet.sheet_name().to_string()));
        }

        let was_ordered = self.is_ordered();
        let mut candidate = match mode {
            OrderingMode::Replace => Vec::with_capacity(columns.len()),
            OrderingMode::Append => self.entries.clone(),
        };
        let added = columns.len();
        candidate.extend(
            columns
                .into_iter()
                .map(|column| OrderingEntry { column, descending }),
        );

        let resolved = Arc::new(self.resolve(&candidate)?);

        let snapshot = self.register_undo(mode);

        self.entries = candidate;
        self.invalidate();
        self.resolved = Some(Arc::clone(&resolved));

        info!(
            target: "sort::ordering",
            sheet = %self.sheet.sheet_name(),
            ?mode,
            added,
            descending,
            keys = self.entries.len(),
            "ordering changed"
        );

        if self.is_ordered() || was_ordered {
            self.executor
                .submit_with_snapshot(resolved, snapshot)
                .map(Some)
        } else {
            Ok(None)
        }
    }

    /// Add columns as further tie-breakers.
    pub async fn add_ordering<I>(&mut self, columns: I, descending: bool) -> Result<Option<SortHandle>>
    where
        I: IntoIterator,
        I::Item: Into<ColumnRef<S::Row>>,
    {
        self.set_ordering(columns, descending, OrderingMode::Append).await
    }

    /// Remove every entry. Rows keep their current order.
    pub async fn clear(&mut self) -> Result<Option<SortHandle>> {
        self.set_ordering(Vec::<ColumnRef<S::Row>>::new(), false, OrderingMode::Replace)
            .await
    }

    /// Re-sort the rows by the current ordering.
    pub fn sort(&mut self) -> Result<SortHandle> {
        let resolved = self.resolved_ordering()?;
        self.executor.submit(resolved)
    }

    /// Replay an undo batch recorded by this manager, in registration order.
    /// Returns the handle of a re-sort if the batch asked for one.
    pub async fn undo(&mut self, batch: UndoBatch<S::Row>) -> Result<Option<SortHandle>> {
        debug!(
            target: "sort::ordering",
            sheet = %self.sheet.sheet_name(),
            label = %batch.label,
            actions = batch.actions.len(),
            "undoing ordering change"
        );

        let mut handle = None;
        for action in batch.actions {
            match action {
                UndoAction::RestoreOrdering(entries) => {
                    self.entries = entries;
                    self.invalidate();
                }
                UndoAction::Resort => {
                    handle = Some(self.sort()?);
                }
                UndoAction::RestoreRows(snapshot) => {
                    let Some(previous) = snapshot.rows() else {
                        continue;
                    };
                    self.executor.cancel_all();
                    let rows = self.sheet.rows();
                    let mut state = rows.lock().await;
                    if let Some(current) = state.loaded_mut() {
                        current.clear();
                        current.extend_from_slice(previous);
                    }
                }
            }
        }
        Ok(handle)
    }

    fn invalidate(&mut self) {
        self.resolved = None;
    }

    fn resolve(&self, entries: &[OrderingEntry<S::Row>]) -> Result<ResolvedOrdering<S::Row>> {
        entries
            .iter()
            .map(|entry| {
                let column = match &entry.column {
                    ColumnRef::Name(name) => self.sheet.column(name)?,
                    ColumnRef::Handle(column) => {
                        if !self.sheet.contains_column(column.id()) {
                            return Err(SortError::StaleColumn {
                                id: column.id(),
                                name: column.name().to_string(),
                            });
                        }
                        Arc::clone(column)
                    }
                };
                Ok(ResolvedEntry {
                    column,
                    descending: entry.descending,
                })
            })
            .collect()
    }

    /// Record how to revert the change about to be committed. Never waits on
    /// the rows: when the rows must be restored, the triggered sort fills the
    /// returned snapshot once it holds the row lock.
    fn register_undo(&self, mode: OrderingMode) -> Option<RowSnapshot<S::Row>> {
        if !self.config.undo_enabled {
            return None;
        }
        let undo_log = self.undo_log.as_ref()?;

        let label = match mode {
            OrderingMode::Replace => "replace ordering",
            OrderingMode::Append => "append ordering",
        };
        let mut batch = UndoBatch::new(label);
        batch.push(UndoAction::RestoreOrdering(self.entries.clone()));
        let snapshot = if self.is_ordered() {
            batch.push(UndoAction::Resort);
            None
        } else {
            let snapshot = RowSnapshot::new();
            batch.push(UndoAction::RestoreRows(snapshot.clone()));
            Some(snapshot)
        };
        undo_log.record(batch);
        snapshot
    }
}
