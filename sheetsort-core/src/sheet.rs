//! Sheet collaborator: the row sequence a sorter reorders and the columns it
//! reads typed values from.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::column::{Column, ColumnHandle, ColumnId, ColumnType, TypedValue};
use crate::error::{Result, SortError};

/// Row sequence of a sheet. `Unloaded` means the loader has not produced
/// rows yet; sorting such a sheet is a no-op.
#[derive(Debug, Clone, Default)]
pub enum RowState<R> {
    #[default]
    Unloaded,
    Loaded(Vec<R>),
}

impl<R> RowState<R> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, RowState::Loaded(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RowState::Loaded(rows) => rows.len(),
            RowState::Unloaded => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn loaded(&self) -> Option<&Vec<R>> {
        match self {
            RowState::Loaded(rows) => Some(rows),
            RowState::Unloaded => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut Vec<R>> {
        match self {
            RowState::Loaded(rows) => Some(rows),
            RowState::Unloaded => None,
        }
    }
}

/// Shared handle to a sheet's rows. Whoever holds the lock has exclusive
/// access to the sequence; reorders happen inside the same `Vec`.
pub type SharedRows<R> = Arc<Mutex<RowState<R>>>;

/// A tabular data source whose rows can be ordered.
pub trait SheetSource: Send + Sync + 'static {
    type Row: Clone + Send + Sync + 'static;

    fn sheet_name(&self) -> &str;

    /// Columns currently visible on the sheet, in display order.
    fn columns(&self) -> Vec<ColumnHandle<Self::Row>>;

    fn rows(&self) -> SharedRows<Self::Row>;

    /// Look a column up by name. Zero or several matches are errors; this
    /// never picks one of several same-named columns.
    fn column(&self, name: &str) -> Result<ColumnHandle<Self::Row>> {
        let mut matches = self
            .columns()
            .into_iter()
            .filter(|col| col.name() == name)
            .collect::<Vec<_>>();

        match matches.len() {
            0 => Err(SortError::ColumnNotFound(name.to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(SortError::AmbiguousColumn {
                name: name.to_string(),
                matches: n,
            }),
        }
    }

    fn contains_column(&self, id: ColumnId) -> bool {
        self.columns().iter().any(|col| col.id() == id)
    }
}

/// Row type of [`MemorySheet`]: raw cells by position.
pub type Record = Vec<String>;

/// Column reading one field of a [`Record`] and coercing it to its type.
pub struct FieldColumn {
    id: ColumnId,
    name: String,
    field: usize,
    column_type: RwLock<ColumnType>,
}

impl FieldColumn {
    pub fn new(name: impl Into<String>, field: usize, column_type: ColumnType) -> Self {
        Self {
            id: ColumnId::new(),
            name: name.into(),
            field,
            column_type: RwLock::new(column_type),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn set_type(&self, column_type: ColumnType) {
        *self
            .column_type
            .write()
            .unwrap_or_else(PoisonError::into_inner) = column_type;
    }
}

impl fmt::Debug for FieldColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldColumn")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("field", &self.field)
            .field("column_type", &self.column_type())
            .finish()
    }
}

impl Column<Record> for FieldColumn {
    fn id(&self) -> ColumnId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn column_type(&self) -> ColumnType {
        *self
            .column_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn typed_value(&self, row: &Record) -> TypedValue {
        row.get(self.field)
            .map(|raw| self.column_type().coerce(raw))
            .unwrap_or(TypedValue::Null)
    }
}

/// In-memory sheet of [`Record`]s.
pub struct MemorySheet {
    name: String,
    columns: RwLock<Vec<Arc<FieldColumn>>>,
    rows: SharedRows<Record>,
}

impl fmt::Debug for MemorySheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row_count = self.rows.try_lock().map(|rows| rows.len()).ok();

        f.debug_struct("MemorySheet")
            .field("name", &self.name)
            .field("columns", &self.field_columns().len())
            .field("rows", &row_count)
            .finish()
    }
}

impl MemorySheet {
    /// Create an empty sheet whose rows are not loaded yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: RwLock::new(Vec::new()),
            rows: Arc::new(Mutex::new(RowState::Unloaded)),
        }
    }

    /// Create a loaded sheet with one column per `(name, type)`, reading the
    /// record field at the same position.
    pub fn from_records(
        name: impl Into<String>,
        columns: &[(&str, ColumnType)],
        rows: Vec<Record>,
    ) -> Self {
        let sheet = Self {
            name: name.into(),
            columns: RwLock::new(Vec::new()),
            rows: Arc::new(Mutex::new(RowState::Loaded(rows))),
        };
        for (col_name, column_type) in columns {
            sheet.add_column(*col_name, *column_type);
        }
        sheet
    }

    /// Add a column reading the next unused field position.
    pub fn add_column(&self, name: impl Into<String>, column_type: ColumnType) -> Arc<FieldColumn> {
        let field = self
            .field_columns()
            .iter()
            .map(|col| col.field() + 1)
            .max()
            .unwrap_or(0);
        self.add_column_at(name, field, column_type)
    }

    pub fn add_column_at(
        &self,
        name: impl Into<String>,
        field: usize,
        column_type: ColumnType,
    ) -> Arc<FieldColumn> {
        let column = Arc::new(FieldColumn::new(name, field, column_type));
        self.columns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&column));
        column
    }

    pub fn remove_column(&self, id: ColumnId) -> bool {
        let mut columns = self.columns.write().unwrap_or_else(PoisonError::into_inner);
        let before = columns.len();
        columns.retain(|col| col.id() != id);
        columns.len() != before
    }

    pub fn field_columns(&self) -> Vec<Arc<FieldColumn>> {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn load(&self, rows: Vec<Record>) {
        *self.rows.lock().await = RowState::Loaded(rows);
    }

    pub async fn unload(&self) {
        *self.rows.lock().await = RowState::Unloaded;
    }

    /// Copy of the current rows, `None` while unloaded.
    pub async fn snapshot(&self) -> Option<Vec<Record>> {
        self.rows.lock().await.loaded().cloned()
    }
}

impl SheetSource for MemorySheet {
    type Row = Record;

    fn sheet_name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> Vec<ColumnHandle<Record>> {
        self.field_columns()
            .into_iter()
            .map(|col| col as ColumnHandle<Record>)
            .collect()
    }

    fn rows(&self) -> SharedRows<Record> {
        Arc::clone(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cells: &[&str]) -> Record {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_column_lookup_by_name() {
        let sheet = MemorySheet::from_records(
            "people",
            &[("name", ColumnType::Text), ("age", ColumnType::Int)],
            vec![record(&["ada", "36"])],
        );

        let age = sheet.column("age").unwrap();
        assert_eq!(age.typed_value(&record(&["ada", "36"])), TypedValue::Int(36));
        assert!(matches!(
            sheet.column("height"),
            Err(SortError::ColumnNotFound(name)) if name == "height"
        ));
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let sheet = MemorySheet::from_records("dupes", &[("a", ColumnType::Any)], vec![]);
        sheet.add_column("a", ColumnType::Int);

        assert!(matches!(
            sheet.column("a"),
            Err(SortError::AmbiguousColumn { matches: 2, .. })
        ));
    }

    #[test]
    fn test_removed_column_is_not_contained() {
        let sheet = MemorySheet::from_records("s", &[("a", ColumnType::Any)], vec![]);
        let id = sheet.column("a").unwrap().id();
        assert!(sheet.contains_column(id));
        assert!(sheet.remove_column(id));
        assert!(!sheet.contains_column(id));
    }

    #[test]
    fn test_missing_field_reads_as_null() {
        let col = FieldColumn::new("c", 4, ColumnType::Int);
        assert_eq!(col.typed_value(&record(&["1"])), TypedValue::Null);
    }
}
