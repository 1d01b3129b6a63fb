//! Monthly finance partitions stored as objects
//!
//! Keys follow `<prefix><YYYY>/<MM>/<name><DDDD>.csv`. Year, month and
//! department are read at fixed character offsets, so a change in the
//! naming convention shows up as a parse error here instead of as wrong
//! fiscal fields downstream.

use super::types::{Extract, Extractor};
use crate::decode::DecoderConfig;
use crate::error::{Error, Result};
use crate::output::ObjectStorage;
use crate::transform::{CalendarPeriod, TransformContext};
use async_trait::async_trait;
use tracing::{debug, info};

/// Facts encoded in a partition's storage key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionKey {
    /// Calendar period of the partition
    pub period: CalendarPeriod,
    /// Department code
    pub department: i64,
}

impl PartitionKey {
    /// Parse a key listed under `prefix`
    ///
    /// With `p = prefix.len()`: year is `key[p..p+4]`, month is
    /// `key[p+5..p+7]` and department is `key[len-8..len-4]`. The bytes at
    /// `p+4` and `p+7` must be `/`.
    pub fn parse(key: &str, prefix: &str) -> Result<Self> {
        let bad = |message: &str| Error::malformed_row(0, key, message);

        if !key.starts_with(prefix) {
            return Err(bad("key is outside the partition prefix"));
        }

        let p = prefix.len();
        let len = key.len();
        let separator = |at: usize| key.as_bytes().get(at) == Some(&b'/');
        if !separator(p + 4) || !separator(p + 7) {
            return Err(bad("expected '<YYYY>/<MM>/' after the prefix"));
        }

        let year = digits(key, p, 4)
            .and_then(|s| s.parse::<i32>().ok())
            .ok_or_else(|| bad("no four-digit year after the prefix"))?;
        let month = digits(key, p + 5, 2)
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| bad("no two-digit month after the year"))?;
        let department = len
            .checked_sub(8)
            .filter(|&start| start >= p + 8)
            .and_then(|start| digits(key, start, 4))
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| bad("no four-digit department before the suffix"))?;
        let period =
            CalendarPeriod::new(year, month).ok_or_else(|| bad("month is out of range"))?;

        Ok(Self { period, department })
    }

    /// Context handed to the transform for this partition
    pub fn context(&self, origin: &str) -> TransformContext {
        TransformContext {
            period: Some(self.period),
            department: Some(self.department),
            origin: Some(origin.to_string()),
        }
    }
}

/// `width` ASCII digits at `start`
fn digits(key: &str, start: usize, width: usize) -> Option<&str> {
    key.get(start..start + width)
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
}

/// Lists, reads and decodes every object under a prefix
#[derive(Debug, Clone)]
pub struct PartitionExtractor {
    name: String,
    prefix: String,
    storage: ObjectStorage,
    decoder: DecoderConfig,
}

impl PartitionExtractor {
    /// Create an extractor for comma-delimited partitions
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, storage: ObjectStorage) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            storage,
            decoder: DecoderConfig::csv(),
        }
    }

    /// Override the payload decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }
}

#[async_trait]
impl Extractor for PartitionExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self) -> Result<Vec<Extract>> {
        let keys = self
            .storage
            .list(&self.prefix)
            .await
            .map_err(|e| e.into_source_unavailable(&self.name))?;

        let mut extracts = Vec::with_capacity(keys.len());
        // Directory placeholders carry no data
        for key in keys.iter().filter(|k| !k.ends_with('/')) {
            let partition = PartitionKey::parse(key, &self.prefix)?;

            let body = self
                .storage
                .get(key)
                .await
                .map_err(|e| e.into_source_unavailable(&self.name))?;
            let table = self.decoder.decode_bytes(&body)?;

            debug!("Extracted {} rows from partition {}", table.len(), key);
            extracts.push(Extract::with_context(table, partition.context(key)));
        }

        let total: usize = extracts.iter().map(Extract::len).sum();
        info!(
            "Extracted {} rows from {} partitions of '{}'",
            total,
            extracts.len(),
            self.name
        );
        Ok(extracts)
    }
}
