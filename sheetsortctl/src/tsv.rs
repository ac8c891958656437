//! Delimited text in and out, quoted fields included.

use std::io::Write;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use sheetsort_core::Record;

/// A parsed delimited file: column names plus raw rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Parse `text`. Rows may differ in width. Without a header row, columns
    /// are named by their 1-based position.
    pub fn parse(text: &str, delimiter: char, has_header: bool) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter_byte(delimiter)?)
            .has_headers(has_header)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = if has_header {
            let header = reader.headers().context("failed to read header row")?;
            (!header.is_empty()).then(|| to_record(header))
        } else {
            None
        };

        let rows = reader
            .records()
            .enumerate()
            .map(|(idx, record)| {
                record
                    .map(|record| to_record(&record))
                    .with_context(|| format!("failed to read row {}", idx + 1))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, rows })
    }

    /// Column names, synthesized from the widest row when there is no header.
    pub fn column_names(&self) -> Vec<String> {
        match &self.header {
            Some(header) => header.clone(),
            None => {
                let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
                (1..=width).map(|n| n.to_string()).collect()
            }
        }
    }
}

fn to_record(record: &StringRecord) -> Record {
    record.iter().map(str::to_string).collect()
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("delimiter {delimiter:?} is not a single-byte ASCII character");
    }
    Ok(delimiter as u8)
}

/// Write the header (if any) and `rows`, quoting fields that need it.
pub fn write_rows<W: Write>(
    out: W,
    header: Option<&[String]>,
    rows: &[Record],
    delimiter: char,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .flexible(true)
        .from_writer(out);

    if let Some(header) = header {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
