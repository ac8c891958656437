//! Column handles and the typed values they produce for a row.
//!
//! Columns are owned by the sheet. The sorter only ever holds cloned
//! [`ColumnHandle`]s and asks them for the typed value of a row.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable identity of a column, independent of its (possibly shared) name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub Uuid);

impl ColumnId {
    pub fn new() -> Self {
        ColumnId(Uuid::new_v4())
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared type of a column, used to coerce raw cells into [`TypedValue`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[default]
    Any,
    Text,
    Int,
    Float,
    Date,
}

impl ColumnType {
    /// Coerce a raw cell.
    ///
    /// Blank cells of a typed column become [`TypedValue::Null`]. A cell that
    /// does not parse under the declared type is passed through as text, so a
    /// mistyped column yields values that cannot be ordered against the rest.
    pub fn coerce(self, raw: &str) -> TypedValue {
        let trimmed = raw.trim();
        match self {
            ColumnType::Any | ColumnType::Text => TypedValue::Text(raw.to_string()),
            _ if trimmed.is_empty() => TypedValue::Null,
            ColumnType::Int => trimmed
                .parse::<i64>()
                .map(TypedValue::Int)
                .unwrap_or_else(|_| TypedValue::Text(raw.to_string())),
            ColumnType::Float => trimmed
                .parse::<f64>()
                .map(|v| TypedValue::Float(OrderedFloat(v)))
                .unwrap_or_else(|_| TypedValue::Text(raw.to_string())),
            ColumnType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(TypedValue::Date)
                .unwrap_or_else(|_| TypedValue::Text(raw.to_string())),
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(ColumnType::Any),
            "text" | "str" | "string" => Ok(ColumnType::Text),
            "int" | "integer" => Ok(ColumnType::Int),
            "float" | "number" => Ok(ColumnType::Float),
            "date" => Ok(ColumnType::Date),
            other => Err(format!("unknown column type `{other}`")),
        }
    }
}

/// Value of a cell under its column's current typing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypedValue {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    Date(NaiveDate),
}

impl TypedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Int(_) => "int",
            TypedValue::Float(_) => "float",
            TypedValue::Text(_) => "text",
            TypedValue::Date(_) => "date",
        }
    }

    /// Natural ordering of two values.
    ///
    /// Nulls sort before everything else and integers compare numerically
    /// against floats. Any other pair of differing kinds has no order.
    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, IncomparableValues> {
        use TypedValue::*;

        match (self, other) {
            (Null, Null) => Ok(Ordering::Equal),
            (Null, _) => Ok(Ordering::Less),
            (_, Null) => Ok(Ordering::Greater),
            (Int(a), Int(b)) => Ok(a.cmp(b)),
            (Float(a), Float(b)) => Ok(a.cmp(b)),
            (Int(a), Float(b)) => Ok(cmp_int_float(*a, b.0)),
            (Float(a), Int(b)) => Ok(cmp_int_float(*b, a.0).reverse()),
            (Text(a), Text(b)) => Ok(a.cmp(b)),
            (Date(a), Date(b)) => Ok(a.cmp(b)),
            _ => Err(IncomparableValues {
                left: self.clone(),
                right: other.clone(),
            }),
        }
    }
}

/// Exact comparison of an integer against a float. Casting the integer
/// loses precision above 2^53, which would break transitivity.
/// NaN sorts above every integer, as `OrderedFloat` sorts it above every float.
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() || float >= BOUND {
        return Ordering::Less;
    }
    if float < -BOUND {
        return Ordering::Greater;
    }
    let whole = float.trunc();
    int.cmp(&(whole as i64)).then_with(|| {
        if float > whole {
            Ordering::Less
        } else if float < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => f.write_str("null"),
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::Float(v) => write!(f, "{}", v.0),
            TypedValue::Text(v) => write!(f, "{v:?}"),
            TypedValue::Date(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot order {} value {left} against {} value {right}", .left.kind(), .right.kind())]
pub struct IncomparableValues {
    pub left: TypedValue,
    pub right: TypedValue,
}

/// A column of a sheet whose rows are of type `R`.
pub trait Column<R>: Send + Sync + fmt::Debug {
    fn id(&self) -> ColumnId;

    fn name(&self) -> &str;

    fn column_type(&self) -> ColumnType;

    /// Value of `row` under this column's current type.
    fn typed_value(&self, row: &R) -> TypedValue;
}

pub type ColumnHandle<R> = Arc<dyn Column<R>>;

/// Reference to a column as supplied by a caller: either a live handle or a
/// name that still has to be resolved against the sheet.
pub enum ColumnRef<R> {
    Handle(ColumnHandle<R>),
    Name(String),
}

impl<R> ColumnRef<R> {
    pub fn label(&self) -> &str {
        match self {
            ColumnRef::Handle(col) => col.name(),
            ColumnRef::Name(name) => name,
        }
    }
}

impl<R> Clone for ColumnRef<R> {
    fn clone(&self) -> Self {
        match self {
            ColumnRef::Handle(col) => ColumnRef::Handle(Arc::clone(col)),
            ColumnRef::Name(name) => ColumnRef::Name(name.clone()),
        }
    }
}

impl<R> fmt::Debug for ColumnRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Handle(col) => f
                .debug_tuple("Handle")
                .field(&col.name())
                .field(&col.id())
                .finish(),
            ColumnRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

impl<R> From<&str> for ColumnRef<R> {
    fn from(name: &str) -> Self {
        ColumnRef::Name(name.to_string())
    }
}

impl<R> From<String> for ColumnRef<R> {
    fn from(name: String) -> Self {
        ColumnRef::Name(name)
    }
}

impl<R> From<ColumnHandle<R>> for ColumnRef<R> {
    fn from(col: ColumnHandle<R>) -> Self {
        ColumnRef::Handle(col)
    }
}

impl<R> From<&ColumnHandle<R>> for ColumnRef<R> {
    fn from(col: &ColumnHandle<R>) -> Self {
        ColumnRef::Handle(Arc::clone(col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_by_type() {
        assert_eq!(ColumnType::Int.coerce(" 42 "), TypedValue::Int(42));
        assert_eq!(
            ColumnType::Float.coerce("2.5"),
            TypedValue::Float(OrderedFloat(2.5))
        );
        assert_eq!(ColumnType::Int.coerce(""), TypedValue::Null);
        assert_eq!(ColumnType::Any.coerce(""), TypedValue::Text(String::new()));
        assert_eq!(
            ColumnType::Date.coerce("2024-02-29"),
            TypedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn test_mistyped_cell_passes_through_as_text() {
        assert_eq!(
            ColumnType::Int.coerce("n/a"),
            TypedValue::Text("n/a".to_string())
        );
    }

    #[test]
    fn test_natural_ordering() {
        let one = TypedValue::Int(1);
        let half = TypedValue::Float(OrderedFloat(0.5));
        assert_eq!(one.try_cmp(&half), Ok(Ordering::Greater));
        assert_eq!(TypedValue::Null.try_cmp(&one), Ok(Ordering::Less));
        assert_eq!(
            TypedValue::Text("a".into()).try_cmp(&TypedValue::Text("b".into())),
            Ok(Ordering::Less)
        );
    }

    #[test]
    fn test_int_float_comparison_is_exact() {
        let int = |v: i64| TypedValue::Int(v);
        let float = |v: f64| TypedValue::Float(OrderedFloat(v));
        let two_53 = 9_007_199_254_740_992_i64;

        assert_eq!(int(two_53 + 1).try_cmp(&float(two_53 as f64)), Ok(Ordering::Greater));
        assert_eq!(float(two_53 as f64).try_cmp(&int(two_53 + 1)), Ok(Ordering::Less));
        assert_eq!(int(two_53).try_cmp(&float(two_53 as f64)), Ok(Ordering::Equal));
        assert_eq!(int(i64::MAX).try_cmp(&float(i64::MAX as f64)), Ok(Ordering::Less));
        assert_eq!(int(i64::MIN).try_cmp(&float(i64::MIN as f64)), Ok(Ordering::Equal));
        assert_eq!(int(-3).try_cmp(&float(-2.5)), Ok(Ordering::Less));
        assert_eq!(int(-2).try_cmp(&float(-2.5)), Ok(Ordering::Greater));
        assert_eq!(int(0).try_cmp(&float(-0.0)), Ok(Ordering::Equal));
        assert_eq!(int(i64::MAX).try_cmp(&float(f64::NAN)), Ok(Ordering::Less));
        assert_eq!(float(f64::NEG_INFINITY).try_cmp(&int(i64::MIN)), Ok(Ordering::Less));

        // the three values that used to form a cycle
        let (a, b, c) = (int(two_53), float(two_53 as f64), int(two_53 + 1));
        assert_eq!(a.try_cmp(&b), Ok(Ordering::Equal));
        assert_eq!(b.try_cmp(&c), Ok(Ordering::Less));
        assert_eq!(a.try_cmp(&c), Ok(Ordering::Less));
    }

    #[test]
    fn test_mixed_kinds_are_incomparable() {
        let err = TypedValue::Int(3)
            .try_cmp(&TypedValue::Text("x".into()))
            .unwrap_err();
        assert_eq!(err.left, TypedValue::Int(3));
        assert!(err.to_string().contains("int value 3"));
    }
}
