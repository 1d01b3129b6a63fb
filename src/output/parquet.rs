//! Parquet serialization of canonical records
//!
//! Column types are inferred from the canonical values: integers become
//! Int64, any float widens the column to Float64, and everything else
//! (text, timestamps, WKT points, mixed columns) is stored as Utf8.

use crate::error::{Error, Result};
use crate::record::{CanonicalRecord, CanonicalValue};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024, // 1M rows
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Infer the Arrow type of one column
fn column_type(records: &[CanonicalRecord], field: &str) -> DataType {
    let mut inferred = DataType::Null;
    for value in records.iter().filter_map(|r| r.get(field)) {
        let this = match value {
            CanonicalValue::Null => continue,
            CanonicalValue::Integer(_) => DataType::Int64,
            CanonicalValue::Float(_) => DataType::Float64,
            _ => return DataType::Utf8,
        };
        inferred = match (&inferred, this) {
            (DataType::Null, t) => t,
            (DataType::Int64, DataType::Float64) => DataType::Float64,
            (current, _) => current.clone(),
        };
    }

    // All-null columns are still written, as strings
    if inferred == DataType::Null {
        DataType::Utf8
    } else {
        inferred
    }
}

/// Convert canonical records into a single Arrow batch
pub fn records_to_batch(records: &[CanonicalRecord]) -> Result<RecordBatch> {
    let Some(first) = records.first() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };

    let names: Vec<&str> = first.field_names().collect();
    let mut fields = Vec::with_capacity(names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(names.len());

    for name in names {
        let data_type = column_type(records, name);
        let values = records.iter().map(|r| r.get(name));

        let array: ArrayRef = match data_type {
            DataType::Int64 => Arc::new(
                values
                    .map(|v| match v {
                        Some(CanonicalValue::Integer(i)) => Some(*i),
                        _ => None,
                    })
                    .collect::<Int64Array>(),
            ),
            DataType::Float64 => Arc::new(
                values
                    .map(|v| match v {
                        Some(CanonicalValue::Integer(i)) => Some(*i as f64),
                        Some(CanonicalValue::Float(f)) => Some(*f),
                        _ => None,
                    })
                    .collect::<Float64Array>(),
            ),
            _ => Arc::new(
                values
                    .map(|v| v.and_then(CanonicalValue::render))
                    .collect::<StringArray>(),
            ),
        };

        fields.push(Field::new(name, array.data_type().clone(), true));
        columns.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Serialize records into an in-memory Parquet file
///
/// A Parquet file needs at least one column, so an empty record set is an
/// output error.
pub fn write_parquet(records: &[CanonicalRecord], config: &ParquetWriterConfig) -> Result<Bytes> {
    if records.is_empty() {
        return Err(Error::output("No records to write"));
    }

    let batch = records_to_batch(records)?;
    let mut buffer = Vec::new();

    let mut writer =
        ArrowWriter::try_new(&mut buffer, batch.schema(), Some(config.build_properties()))
            .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(Bytes::from(buffer))
}
