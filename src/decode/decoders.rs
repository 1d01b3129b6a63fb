//! Decoder implementations
//!
//! Each decoder handles a specific payload layout. Every cell is read as
//! text; typing happens in the transform.

use super::types::TableDecoder;
use crate::error::Result;
use crate::record::{RawTable, RawValue};
use csv::ReaderBuilder;

// ============================================================================
// TSV Decoder
// ============================================================================

/// Tab-delimited decoder
///
/// Fields are split on every tab. There is no quoting or escaping, so a
/// line whose field count differs from the header is a `MalformedRow`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvDecoder;

impl TsvDecoder {
    /// Create a new TSV decoder
    pub fn new() -> Self {
        Self
    }
}

impl TableDecoder for TsvDecoder {
    fn decode(&self, body: &str) -> Result<RawTable> {
        let mut lines = body.lines().filter(|line| !line.is_empty());

        let Some(header) = lines.next() else {
            return Ok(RawTable::default());
        };
        let columns = header.split('\t').map(|c| c.trim().to_string()).collect();
        let mut table = RawTable::new(columns);

        for line in lines {
            table.push_row(line.split('\t').map(RawValue::from).collect())?;
        }

        Ok(table)
    }
}

// ============================================================================
// CSV Decoder
// ============================================================================

/// Comma-delimited decoder with RFC-4180 quoting
#[derive(Debug, Clone, Copy)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvDecoder {
    /// Create a new CSV decoder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a CSV decoder with a custom delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl TableDecoder for CsvDecoder {
    fn decode(&self, body: &str) -> Result<RawTable> {
        // flexible so a short row is reported by the table, with its index
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        let columns = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = RawTable::new(columns);

        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(RawValue::from).collect())?;
        }

        Ok(table)
    }
}
