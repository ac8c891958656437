use thiserror::Error;

use crate::column::{ColumnId, TypedValue};

#[derive(Error, Debug)]
pub enum SortError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Ambiguous column name `{name}` matches {matches} columns")]
    AmbiguousColumn { name: String, matches: usize },

    #[error("Column `{name}` ({id}) is no longer part of the sheet")]
    StaleColumn { id: ColumnId, name: String },

    #[error("Append requires at least one column")]
    EmptyAppend,

    #[error("A sort is already running on sheet `{0}`")]
    SortInFlight(String),

    #[error("Unknown sort command: {0}")]
    UnknownCommand(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SortError>;

/// Two rows could not be ordered under a column's current typing.
///
/// Reported as the outcome of an incomplete sort rather than raised, so the
/// caller can retype `column` and sort again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot order {} value {left} against {} value {right} in column `{column}`", .left.kind(), .right.kind())]
pub struct ComparisonError {
    pub column_id: ColumnId,
    pub column: String,
    pub left: TypedValue,
    pub right: TypedValue,
}
