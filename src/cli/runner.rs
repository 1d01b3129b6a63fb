//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::pipeline::{Pipeline, RunOptions};
use crate::registry::Registry;
use crate::template::TemplateContext;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use tracing::warn;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                source,
                dry_run,
                as_of,
            } => self.run_source(source, *dry_run, *as_of).await,
            Commands::Sources => self.sources(),
            Commands::Validate => self.validate(),
        }
    }

    /// Template context: process environment plus `--var` values
    fn template_context(&self) -> TemplateContext {
        let mut ctx = TemplateContext::from_env();
        let vars: Map<String, Value> = self
            .cli
            .vars
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        ctx.set_vars(Value::Object(vars));
        ctx
    }

    /// Load the configuration file
    fn load_config(&self) -> Result<PipelineConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Configuration file not specified (use --config)"))?;
        PipelineConfig::load(path, &self.template_context())
    }

    /// Run one source
    async fn run_source(&self, source: &str, dry_run: bool, as_of: Option<NaiveDate>) -> Result<()> {
        let config = self.load_config()?;
        let options = as_of
            .map_or_else(RunOptions::today, RunOptions::new)
            .with_dry_run(dry_run);

        let summary = Pipeline::new(config)?.run(source, &options).await?;

        if let Some(ref load) = summary.load {
            if load.errors > 0 {
                warn!("{} rows were rejected by {}", load.errors, summary.destination);
            }
        }

        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": summary
        }));

        Ok(())
    }

    /// List sources
    fn sources(&self) -> Result<()> {
        let registry = match self.cli.config {
            Some(_) => Registry::from_config(&self.load_config()?)?,
            None => Registry::builtin(),
        };

        let sources: Vec<Value> = registry
            .jobs()
            .map(|job| {
                json!({
                    "name": job.name,
                    "kind": job.source.kind(),
                    "profile": job.profile.name(),
                    "destination": job.destination.describe(),
                    "description": job.description,
                    "requires": job.requirements()
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "SOURCES",
            "sources": sources
        }));

        Ok(())
    }

    /// Validate every source against the configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        let registry = Registry::from_config(&config)?;

        let mut failures = 0;
        let results: Vec<Value> = registry
            .jobs()
            .map(|job| match job.validate(&config) {
                Ok(()) => json!({"name": job.name, "status": "OK"}),
                Err(e) => {
                    failures += 1;
                    json!({"name": job.name, "status": "MISSING", "message": e.to_string()})
                }
            })
            .collect();

        self.output_message(&json!({
            "type": "VALIDATION",
            "sources": results
        }));

        if failures > 0 {
            return Err(Error::config(format!(
                "{failures} of {} sources cannot run with this configuration",
                results.len()
            )));
        }
        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
