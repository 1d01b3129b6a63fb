//! Common types used throughout civic-etl
//!
//! Shared enums and small helpers used across multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Load Mode
// ============================================================================

/// How records are written into a catalog dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Insert-or-update by the catalog's row identity
    #[default]
    Upsert,
    /// Swap the dataset's entire content for the supplied records
    Replace,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Upsert => f.write_str("upsert"),
            LoadMode::Replace => f.write_str("replace"),
        }
    }
}

// ============================================================================
// Object Format
// ============================================================================

/// Serialization used for object-storage artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFormat {
    /// Delimited text with a header row
    #[default]
    Csv,
    /// Apache Parquet
    Parquet,
}

impl ObjectFormat {
    /// File suffix appended to the artifact name
    pub fn extension(self) -> &'static str {
        match self {
            ObjectFormat::Csv => "csv",
            ObjectFormat::Parquet => "parquet",
        }
    }
}

// ============================================================================
// Log Level
// ============================================================================

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
