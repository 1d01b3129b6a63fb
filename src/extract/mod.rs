//! Extraction module
//!
//! Sources that yield raw tables for the transform.
//!
//! # Sources
//!
//! - **SQL**: a named query against the attached read-replica
//! - **Delimited**: a tab-delimited export fetched over HTTP
//! - **Report**: a prompted BI report instance
//! - **Partitions**: monthly comma-delimited objects under a storage prefix
//!
//! Every extractor logs the row count it produced. Transport failures come
//! back as `Error::SourceUnavailable`; decoding problems keep their data
//! error kind.

mod delimited;
mod partitions;
mod report;
mod sql;
mod types;

pub use delimited::DelimitedExtractor;
pub use partitions::{PartitionExtractor, PartitionKey};
pub use report::{
    answer_prompts, Prompt, PromptAnswer, PromptBinding, PromptSource, ReportExtractor,
    ReportKind, AUTH_TOKEN_HEADER, EXPENSE_REPORT_ID, PROJECT_HEADER, REVENUE_REPORT_ID,
};
pub use sql::{builtin_query, SqlExtractor, BUILTIN_QUERIES};
pub use types::{Extract, Extractor, SourceDescriptor};

#[cfg(test)]
mod tests;
