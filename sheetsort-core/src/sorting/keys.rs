//! Per-row sort keys and their lexicographic comparison.
//!
//! A descending column does not need a wrapper type: each key element carries
//! its direction and flips the natural comparison, so one ascending pass over
//! the whole key produces any mix of directions.

use std::cmp::Ordering;

use crate::column::{IncomparableValues, TypedValue};
use crate::error::ComparisonError;
use crate::ordering::ResolvedOrdering;

/// One column's contribution to a row's sort key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyElement {
    pub value: TypedValue,
    pub descending: bool,
}

impl KeyElement {
    pub fn ascending(value: TypedValue) -> Self {
        Self {
            value,
            descending: false,
        }
    }

    pub fn descending(value: TypedValue) -> Self {
        Self {
            value,
            descending: true,
        }
    }

    /// `(descending ? -1 : 1) * natural(self, other)`.
    #[inline]
    pub fn compare(&self, other: &Self) -> Result<Ordering, IncomparableValues> {
        let ord = self.value.try_cmp(&other.value)?;
        Ok(if self.descending { ord.reverse() } else { ord })
    }
}

pub type SortKey = Vec<KeyElement>;

/// Build the key of `row`, one element per resolved entry, in entry order.
pub fn sort_key<R>(row: &R, ordering: &ResolvedOrdering<R>) -> SortKey {
    ordering
        .iter()
        .map(|entry| KeyElement {
            value: entry.column.typed_value(row),
            descending: entry.descending,
        })
        .collect()
}

/// Compare two keys built from the same `ordering` by their first differing
/// element.
pub fn compare_keys<R>(
    a: &SortKey,
    b: &SortKey,
    ordering: &ResolvedOrdering<R>,
) -> Result<Ordering, ComparisonError> {
    for ((left, right), entry) in a.iter().zip(b.iter()).zip(ordering.iter()) {
        let ord = left.compare(right).map_err(|err| ComparisonError {
            column_id: entry.column.id(),
            column: entry.column.name().to_string(),
            left: err.left,
            right: err.right,
        })?;
        if ord != Ordering::Equal {
            return Ok(ord);
        }
    }
    Ok(Ordering::Equal)
}
