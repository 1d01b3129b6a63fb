//! Pipeline types
//!
//! Run options and the summary a run reports.

use crate::load::LoadResult;
use chrono::NaiveDate;
use serde::Serialize;

/// Options for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after the transform
    pub dry_run: bool,
    /// Date BI reports are answered for
    pub as_of: NaiveDate,
}

impl RunOptions {
    /// Options for a full run as of a date
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            dry_run: false,
            as_of,
        }
    }

    /// Options for a run as of today
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Skip the load step
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Source name
    pub source: String,
    /// Extracts read (one per partition for partitioned sources)
    pub extracts: usize,
    /// Raw rows across all extracts
    pub rows_extracted: usize,
    /// Canonical records produced
    pub records_transformed: usize,
    /// Destination description
    pub destination: String,
    /// Destination report; absent on dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadResult>,
    /// Whether the load was skipped
    pub dry_run: bool,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Empty summary for a source
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Count one extract
    pub fn add_extract(&mut self, rows: usize) {
        self.extracts += 1;
        self.rows_extracted += rows;
    }

    /// Count transformed records
    pub fn add_records(&mut self, count: usize) {
        self.records_transformed += count;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
