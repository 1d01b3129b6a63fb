//! Pipeline module
//!
//! Runs one registry job: Extract → Transform → Load.
//!
//! # Overview
//!
//! - `Pipeline` - builds the extractor and loader a job needs from config
//! - `execute` - the run itself, over any extractor and loader
//! - `RunSummary` - counts and the destination's report
//!
//! Stages run strictly in order. Any extraction or transform error aborts
//! the run before the destination is touched, so a failed run never
//! writes a partial record set.

mod types;

pub use types::{RunOptions, RunSummary};

use crate::config::PipelineConfig;
use crate::decode::DecoderConfig;
use crate::error::Result;
use crate::extract::{
    DelimitedExtractor, Extractor, PartitionExtractor, ReportExtractor, SourceDescriptor,
    SqlExtractor,
};
use crate::http::{HttpClient, HttpClientConfig};
use crate::load::{CatalogLoader, Destination, Loader, ObjectStoreLoader};
use crate::output::ObjectStorage;
use crate::registry::{Job, Registry};
use crate::transform::{ProfileKind, Transformer};
use std::time::{Duration, Instant};
use tracing::info;

/// Run orchestrator over one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: Registry,
}

impl Pipeline {
    /// Create a pipeline with the config's registry
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let registry = Registry::from_config(&config)?;
        Ok(Self { config, registry })
    }

    /// The configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The jobs this pipeline can run
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run a job by name
    pub async fn run(&self, name: &str, options: &RunOptions) -> Result<RunSummary> {
        let job = self.registry.get(name)?;
        job.validate(&self.config)?;

        info!(
            "Running '{}': {} -> {}",
            job.name,
            job.source.kind(),
            job.destination.describe()
        );

        let extractor = self.extractor(job, options)?;
        let loader = if options.dry_run {
            None
        } else {
            Some(self.loader(job)?)
        };

        execute(extractor.as_ref(), job.profile, loader.as_deref()).await
    }

    /// Build the extractor for a job
    pub fn extractor(&self, job: &Job, options: &RunOptions) -> Result<Box<dyn Extractor>> {
        let extractor: Box<dyn Extractor> = match &job.source {
            SourceDescriptor::Sql { sql, .. } => Box::new(SqlExtractor::connect(
                job.name.clone(),
                sql.clone(),
                self.config.require_database()?,
            )?),
            SourceDescriptor::Delimited { endpoint, encoding } => {
                let endpoint = self.config.require_endpoint(endpoint)?;
                let decoder = DecoderConfig::tsv().with_encoding(endpoint.encoding(*encoding));
                Box::new(DelimitedExtractor::new(
                    job.name.clone(),
                    endpoint.url(),
                    decoder,
                    self.http_client()?,
                ))
            }
            SourceDescriptor::Report { report } => Box::new(ReportExtractor::new(
                job.name.clone(),
                *report,
                options.as_of,
                self.config.require_report_server()?.clone(),
                Duration::from_secs(self.config.http.timeout_secs),
            )?),
            SourceDescriptor::Partitions { prefix } => Box::new(PartitionExtractor::new(
                job.name.clone(),
                prefix.clone(),
                self.storage()?,
            )),
        };
        Ok(extractor)
    }

    /// Build the loader for a job
    pub fn loader(&self, job: &Job) -> Result<Box<dyn Loader>> {
        let loader: Box<dyn Loader> = match &job.destination {
            Destination::ObjectStorage { name, format } => {
                Box::new(ObjectStoreLoader::new(self.storage()?, name.clone(), *format))
            }
            Destination::Catalog { dataset, mode } => {
                let catalog = self.config.require_catalog()?;
                Box::new(CatalogLoader::new(catalog, catalog.dataset_id(dataset)?, *mode)?)
            }
        };
        Ok(loader)
    }

    fn storage(&self) -> Result<ObjectStorage> {
        ObjectStorage::from_config(self.config.require_object_store()?)
    }

    fn http_client(&self) -> Result<HttpClient> {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.config.http.timeout_secs));
        if let Some(ref agent) = self.config.http.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        HttpClient::with_config(builder.build())
    }
}

/// Extract, transform every extract with the profile, then load once
///
/// Without a loader the run stops after the transform and reports the
/// record count as a dry run.
pub async fn execute(
    extractor: &dyn Extractor,
    profile: ProfileKind,
    loader: Option<&dyn Loader>,
) -> Result<RunSummary> {
    let start = Instant::now();
    let destination = loader.map_or_else(|| "dry run".to_string(), |l| l.destination());
    let mut summary = RunSummary::new(extractor.source_name(), destination);

    let extracts = extractor.extract().await?;

    let mut records = Vec::new();
    for extract in &extracts {
        summary.add_extract(extract.len());
        let transformer = Transformer::new(profile.build(&extract.table)?);
        let transformed = transformer.transform(&extract.table, &extract.context)?;
        summary.add_records(transformed.len());
        records.extend(transformed);
    }

    info!(
        "Transformed {} records for '{}' from {} extract(s)",
        records.len(),
        summary.source,
        summary.extracts
    );

    match loader {
        Some(loader) => {
            let result = loader.load(&records).await?;
            info!(
                "Loaded '{}' into {}: {} created, {} updated, {} errors",
                summary.source,
                summary.destination,
                result.created,
                result.updated,
                result.errors
            );
            summary.load = Some(result);
        }
        None => {
            info!("Dry run: {} records not loaded", records.len());
            summary.dry_run = true;
        }
    }

    summary.set_duration(start.elapsed().as_millis() as u64);
    Ok(summary)
}
