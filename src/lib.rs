// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # civic-etl
//!
//! Extracts municipal operational records, canonicalizes them and publishes
//! them to analytic stores.
//!
//! ## Features
//!
//! - **Sources**: SQL against a relational replica, tab-delimited HTTP
//!   exports, prompted BI reports, monthly object-storage partitions
//! - **Canonicalization**: state-plane reprojection to WKT points, timestamp
//!   normalization, fiscal-year derivation, strict field mapping
//! - **Destinations**: CSV or Parquet objects, catalog upsert and replace
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use civic_etl::{Pipeline, PipelineConfig, RunOptions};
//! use civic_etl::template::TemplateContext;
//!
//! #[tokio::main]
//! async fn main() -> civic_etl::Result<()> {
//!     let config = PipelineConfig::load("etl.yaml".as_ref(), &TemplateContext::from_env())?;
//!     let summary = Pipeline::new(config)?
//!         .run("csr", &RunOptions::today())
//!         .await?;
//!     println!("{} records loaded", summary.records_transformed);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                Pipeline: Extract → Transform → Load              │
//! └──────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────┬──────────────────┴───────────┬─────────────────────┐
//! │   Extract   │          Transform           │        Load         │
//! ├─────────────┼──────────────────────────────┼─────────────────────┤
//! │ SQL (DuckDB)│ Spatial  (state plane → WKT) │ Object store CSV    │
//! │ TSV / HTTP  │ Timestamps                   │ Object store Parquet│
//! │ BI report   │ Fiscal year (October start)  │ Catalog upsert      │
//! │ Partitions  │ Mapping + null rules         │ Catalog replace     │
//! └─────────────┴──────────────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Run configuration
pub mod config;

/// Template interpolation for configuration values
pub mod template;

/// Raw and canonical record types
pub mod record;

/// Delimited payload decoders
pub mod decode;

/// HTTP client
pub mod http;

/// Relational replica access via DuckDB
pub mod database;

/// Source extractors
pub mod extract;

/// Canonicalizing transform
pub mod transform;

/// CSV/Parquet serialization and object storage
pub mod output;

/// Destination loaders
pub mod load;

/// Built-in source registry
pub mod registry;

/// Run orchestration
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunOptions, RunSummary};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
