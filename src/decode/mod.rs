//! Payload decoder module
//!
//! Supports: tab-delimited, comma-delimited; UTF-8 and UTF-16 text
//!
//! # Overview
//!
//! Decoders turn a delimited payload into a [`RawTable`](crate::record::RawTable).
//! The header line supplies the column names and every later line is one row.

mod decoders;
mod types;

pub use decoders::{CsvDecoder, TsvDecoder};
pub use types::{DecoderConfig, DecoderFormat, TableDecoder, TextEncoding};
