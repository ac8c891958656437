//! Shared fixtures for sheetsort integration tests.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;

use sheetsort_core::{ColumnType, MemorySheet, Record};

pub fn record(cells: &[&str]) -> Record {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Sheet with an `A` int column and a `B` text column:
/// `[{A:3,B:"x"}, {A:1,B:"y"}, {A:3,B:"a"}]`.
pub fn sample_sheet() -> Arc<MemorySheet> {
    Arc::new(MemorySheet::from_records(
        "sample",
        &[("A", ColumnType::Int), ("B", ColumnType::Text)],
        vec![record(&["3", "x"]), record(&["1", "y"]), record(&["3", "a"])],
    ))
}

/// `count` rows of `(key, original index)` with keys drawn from a small
/// range so that many rows share a key.
pub fn tagged_sheet(count: usize, distinct_keys: u64) -> Arc<MemorySheet> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let rows = (0..count)
        .map(|idx| {
            // xorshift keeps the fixture deterministic without a rand dependency
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            vec![(state % distinct_keys).to_string(), idx.to_string()]
        })
        .collect();

    Arc::new(MemorySheet::from_records(
        "tagged",
        &[("key", ColumnType::Int), ("idx", ColumnType::Int)],
        rows,
    ))
}

pub async fn rows_of(sheet: &MemorySheet) -> Vec<Record> {
    sheet.snapshot().await.expect("rows should be loaded")
}

pub fn column_values(rows: &[Record], field: usize) -> Vec<i64> {
    rows.iter()
        .map(|row| row[field].parse().expect("numeric cell"))
        .collect()
}

/// No neighbouring pair of `items` is out of order under `cmp`.
pub fn is_ordered_by<T>(items: &[T], mut cmp: impl FnMut(&T, &T) -> Ordering) -> bool {
    items.windows(2).all(|pair| cmp(&pair[0], &pair[1]) != Ordering::Greater)
}
