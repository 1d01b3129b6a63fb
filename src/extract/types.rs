//! Extraction types

use super::report::ReportKind;
use crate::decode::TextEncoding;
use crate::error::Result;
use crate::record::RawTable;
use crate::transform::TransformContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One extracted table plus the facts that are not in its rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extract {
    /// Rows as the source emitted them
    pub table: RawTable,
    /// Period, department and origin for the transform
    pub context: TransformContext,
}

impl Extract {
    /// An extract with an empty context
    pub fn new(table: RawTable) -> Self {
        Self {
            table,
            context: TransformContext::default(),
        }
    }

    /// An extract with a context
    pub fn with_context(table: RawTable, context: TransformContext) -> Self {
        Self { table, context }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the extract has no rows
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Where a registry source reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// A named query against the relational replica
    Sql {
        /// Query name
        query: String,
        /// SQL text
        sql: String,
    },
    /// A tab-delimited HTTP export named under `endpoints`
    Delimited {
        /// Endpoint name
        endpoint: String,
        /// Encoding used when the endpoint config does not say
        encoding: TextEncoding,
    },
    /// A prompted BI report
    Report {
        /// Which report and prompt layout
        report: ReportKind,
    },
    /// Comma-delimited objects under a storage prefix
    Partitions {
        /// Key prefix, e.g. `expenses/`
        prefix: String,
    },
}

impl SourceDescriptor {
    /// Short kind label for listings
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDescriptor::Sql { .. } => "sql",
            SourceDescriptor::Delimited { .. } => "delimited",
            SourceDescriptor::Report { .. } => "report",
            SourceDescriptor::Partitions { .. } => "partitions",
        }
    }
}

/// Trait implemented by every source
///
/// An extractor yields one or more tables. Single-table sources return a
/// one-element vector; partitioned sources return one extract per
/// partition in key order. An empty table is not an error.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Registry name of the source, for logs and errors
    fn source_name(&self) -> &str;

    /// Fetch the raw tables
    async fn extract(&self) -> Result<Vec<Extract>>;
}
