//! Decoder types and traits
//!
//! Defines the core decoder abstractions.

use super::decoders::{CsvDecoder, TsvDecoder};
use crate::error::{Error, Result};
use crate::record::RawTable;
use encoding_rs::{UTF_16LE, UTF_8};
use serde::{Deserialize, Serialize};

/// Layout of a delimited payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// Plain tab separation, no quoting (default)
    #[default]
    Tsv,
    /// Comma separated with RFC-4180 quoting
    Csv,
}

/// Character encoding of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8, optional BOM (default)
    #[default]
    Utf8,
    /// UTF-16, byte order from the BOM, little-endian without one
    Utf16,
}

impl TextEncoding {
    /// Decode raw bytes to text
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let encoding = match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Utf16 => UTF_16LE,
        };
        // BOM sniffing overrides the fallback encoding
        let (text, actual, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(Error::decode(format!(
                "payload is not valid {}",
                actual.name()
            )));
        }
        Ok(text.into_owned())
    }
}

/// Configuration for decoding payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Payload layout
    #[serde(default)]
    pub format: DecoderFormat,
    /// Payload encoding
    #[serde(default)]
    pub encoding: TextEncoding,
}

impl DecoderConfig {
    /// Tab-delimited UTF-8
    pub fn tsv() -> Self {
        Self {
            format: DecoderFormat::Tsv,
            encoding: TextEncoding::Utf8,
        }
    }

    /// Comma-delimited UTF-8
    pub fn csv() -> Self {
        Self {
            format: DecoderFormat::Csv,
            encoding: TextEncoding::Utf8,
        }
    }

    /// Set the encoding
    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Build the decoder for this config
    pub fn decoder(&self) -> Box<dyn TableDecoder> {
        match self.format {
            DecoderFormat::Tsv => Box::new(TsvDecoder::new()),
            DecoderFormat::Csv => Box::new(CsvDecoder::new()),
        }
    }

    /// Decode raw bytes into a table
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<RawTable> {
        let text = self.encoding.decode(bytes)?;
        self.decoder().decode(&text)
    }
}

/// Trait for decoding payload text into a raw table
pub trait TableDecoder: Send + Sync {
    /// Decode the body; the first line supplies column names
    fn decode(&self, body: &str) -> Result<RawTable>;
}
