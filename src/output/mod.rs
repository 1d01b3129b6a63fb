//! Output module
//!
//! Serializes canonical records and stores the artifacts.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Writing records as delimited text with a header row
//! - Converting records to Arrow RecordBatches and Parquet files
//! - Object storage access (S3-compatible buckets or a local directory)

mod delimited;
mod parquet;
mod storage;

pub use self::parquet::{records_to_batch, write_parquet, ParquetWriterConfig};
pub use delimited::write_csv;
pub use storage::ObjectStorage;
