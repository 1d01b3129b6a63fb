//! CLI module
//!
//! Command-line interface for running pipeline sources.
//!
//! # Commands
//!
//! - `run --source <name>` - Extract, transform and load one source
//! - `sources` - List the available sources
//! - `validate` - Check the configuration against every source

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
