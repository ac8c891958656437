//! # sheetsort core
//!
//! Multi-column ordering and background sorting for the rows of an in-memory
//! sheet.
//!
//! ## Overview
//!
//! - **Ordering**: an editable list of `(column, descending)` entries per
//!   sheet. Columns may be given as live handles or as names; names are
//!   resolved once, and a name that matches zero or several columns is an
//!   error rather than a guess.
//! - **Sorting**: rows are reordered in place by a stable, cancellable sort
//!   running on a background task, reporting one unit of progress per row.
//!   Values that cannot be ordered under the current column typing end the
//!   sort early with a warning instead of failing the caller.
//! - **Undo**: every ordering change can record how to revert itself.
//!
//! ## Architecture
//!
//! - [`sheet`]: the data source collaborator and an in-memory sheet
//! - [`column`]: column handles and typed values
//! - [`ordering`]: the ordering manager
//! - [`sorting`]: sort keys and the executor
//! - [`progress`], [`undo`], [`commands`], [`config`]
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sheetsort_core::{
//!     ColumnType, MemorySheet, OrderingManager, OrderingMode, SortConfig,
//! };
//!
//! async fn by_price() -> Result<(), Box<dyn std::error::Error>> {
//!     let sheet = Arc::new(MemorySheet::from_records(
//!         "products",
//!         &[("name", ColumnType::Text), ("price", ColumnType::Float)],
//!         vec![
//!             vec!["pear".into(), "1.25".into()],
//!             vec!["fig".into(), "0.80".into()],
//!         ],
//!     ));
//!
//!     let mut manager = OrderingManager::new(Arc::clone(&sheet), SortConfig::default());
//!     if let Some(handle) = manager
//!         .set_ordering(["price"], false, OrderingMode::Replace)
//!         .await?
//!     {
//!         let outcome = handle.wait().await?;
//!         if let Some(warning) = outcome.warning() {
//!             eprintln!("{warning}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod column;
pub mod commands;
pub mod config;
pub mod error;
pub mod ordering;
pub mod progress;
pub mod sheet;
pub mod sorting;
pub mod undo;

pub use column::{Column, ColumnHandle, ColumnId, ColumnRef, ColumnType, TypedValue};
pub use commands::SortCommand;
pub use config::{OverlapPolicy, SortConfig};
pub use error::{ComparisonError, Result, SortError};
pub use ordering::{OrderingEntry, OrderingManager, OrderingMode, ResolvedEntry, ResolvedOrdering};
pub use progress::{Progress, ProgressScope, ProgressSnapshot};
pub use sheet::{FieldColumn, MemorySheet, Record, RowState, SharedRows, SheetSource};
pub use sorting::{SortExecutor, SortHandle, SortOutcome};
pub use undo::{RowSnapshot, UndoAction, UndoBatch, UndoLog, UndoStack};
