//! Named sources selectable with `--source`
//!
//! Every job pairs one source with the transform profile it needs and the
//! destination its records go to. The built-in table is fixed; named
//! queries from the config add passthrough jobs (or replace the SQL of a
//! built-in query of the same name), and `jobs:` overrides adjust the
//! output format or catalog dataset of an existing job.

use crate::config::PipelineConfig;
use crate::decode::TextEncoding;
use crate::error::{Error, Result};
use crate::extract::{ReportKind, SourceDescriptor, BUILTIN_QUERIES};
use crate::load::Destination;
use crate::transform::ProfileKind;
use crate::types::{LoadMode, ObjectFormat};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Built-in source names in listing order
pub const BUILTIN_SOURCES: &[&str] = &[
    "applications_received",
    "active_permits",
    "issued_permits",
    "csr",
    "expenses",
    "revenue",
    "expense_report",
    "revenue_report",
];

/// One runnable source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Selector name
    pub name: String,
    /// One-line description for listings
    pub description: String,
    /// Where the records come from
    pub source: SourceDescriptor,
    /// Transform applied to each extract
    pub profile: ProfileKind,
    /// Where the records go
    pub destination: Destination,
}

impl Job {
    fn query(name: &str, sql: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.into(),
            source: SourceDescriptor::Sql {
                query: name.to_string(),
                sql: sql.to_string(),
            },
            profile: ProfileKind::Passthrough,
            destination: Destination::ObjectStorage {
                name: name.to_string(),
                format: ObjectFormat::Csv,
            },
        }
    }

    /// Config sections this job cannot run without
    pub fn requirements(&self) -> Vec<String> {
        let mut required = Vec::new();
        match &self.source {
            SourceDescriptor::Sql { .. } => required.push("database".to_string()),
            SourceDescriptor::Delimited { endpoint, .. } => {
                required.push(format!("endpoints.{endpoint}"));
            }
            SourceDescriptor::Report { .. } => required.push("report_server".to_string()),
            SourceDescriptor::Partitions { .. } => required.push("object_store".to_string()),
        }
        match &self.destination {
            Destination::ObjectStorage { .. } => required.push("object_store".to_string()),
            Destination::Catalog { dataset, .. } => {
                required.push(format!("catalog.datasets.{dataset}"));
            }
        }
        required.dedup();
        required
    }

    /// Check that every section the job needs is configured
    pub fn validate(&self, config: &PipelineConfig) -> Result<()> {
        match &self.source {
            SourceDescriptor::Sql { .. } => {
                config.require_database()?;
            }
            SourceDescriptor::Delimited { endpoint, .. } => {
                config.require_endpoint(endpoint)?;
            }
            SourceDescriptor::Report { .. } => {
                config.require_report_server()?;
            }
            SourceDescriptor::Partitions { .. } => {
                config.require_object_store()?;
            }
        }
        match &self.destination {
            Destination::ObjectStorage { .. } => {
                config.require_object_store()?;
            }
            Destination::Catalog { dataset, .. } => {
                config.require_catalog()?.dataset_id(dataset)?;
            }
        }
        Ok(())
    }
}

/// The set of jobs available to one run
#[derive(Debug, Clone, Default)]
pub struct Registry {
    jobs: BTreeMap<String, Job>,
    order: Vec<String>,
}

impl Registry {
    /// The fixed built-in jobs
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for (name, sql) in BUILTIN_QUERIES {
            registry.insert(Job::query(name, sql, describe_query(name)));
        }

        registry.insert(Job {
            name: "csr".to_string(),
            description: "311 service requests from the tab-delimited export".to_string(),
            source: SourceDescriptor::Delimited {
                endpoint: "csr".to_string(),
                encoding: TextEncoding::Utf16,
            },
            profile: ProfileKind::Csr,
            destination: Destination::Catalog {
                dataset: "csr".to_string(),
                mode: LoadMode::Upsert,
            },
        });

        for (name, profile) in [("expenses", ProfileKind::Expenses), ("revenue", ProfileKind::Revenue)] {
            registry.insert(Job {
                name: name.to_string(),
                description: format!("Monthly {name} partitions from object storage"),
                source: SourceDescriptor::Partitions {
                    prefix: format!("{name}/"),
                },
                profile,
                destination: Destination::Catalog {
                    dataset: name.to_string(),
                    mode: LoadMode::Replace,
                },
            });
        }

        for report in [ReportKind::Expenses, ReportKind::Revenue] {
            let name = match report {
                ReportKind::Expenses => "expense_report",
                ReportKind::Revenue => "revenue_report",
            };
            registry.insert(Job {
                name: name.to_string(),
                description: format!("Prompted {} BI report", report.name()),
                source: SourceDescriptor::Report { report },
                profile: ProfileKind::Report,
                destination: Destination::ObjectStorage {
                    name: name.to_string(),
                    format: ObjectFormat::Csv,
                },
            });
        }

        registry
    }

    /// Built-in jobs plus the config's queries and overrides
    ///
    /// A query may replace the SQL of a query job but never shadow a job
    /// of another kind.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut registry = Self::builtin();

        for (name, sql) in &config.queries {
            match registry.jobs.get_mut(name) {
                Some(Job {
                    source: SourceDescriptor::Sql { sql: existing, .. },
                    ..
                }) => existing.clone_from(sql),
                Some(job) => {
                    return Err(Error::InvalidConfigValue {
                        field: format!("queries.{name}"),
                        message: format!(
                            "'{name}' is a built-in {} source, not a query",
                            job.source.kind()
                        ),
                    });
                }
                None => registry.insert(Job::query(
                    name,
                    sql,
                    format!("Configured query '{name}'"),
                )),
            }
        }

        for (name, overrides) in &config.jobs {
            let Some(job) = registry.jobs.get_mut(name) else {
                warn!("Ignoring overrides for unknown job '{name}'");
                continue;
            };
            match &mut job.destination {
                Destination::ObjectStorage { format, .. } => {
                    if let Some(f) = overrides.format {
                        *format = f;
                    }
                }
                Destination::Catalog { dataset, .. } => {
                    if let Some(ref d) = overrides.dataset {
                        dataset.clone_from(d);
                    }
                }
            }
        }

        Ok(registry)
    }

    fn insert(&mut self, job: Job) {
        if !self.jobs.contains_key(&job.name) {
            self.order.push(job.name.clone());
        }
        self.jobs.insert(job.name.clone(), job);
    }

    /// Look a job up by selector
    pub fn get(&self, name: &str) -> Result<&Job> {
        self.jobs.get(name).ok_or_else(|| {
            Error::config(format!(
                "unknown source '{name}', expected one of: {}",
                self.order.join(", ")
            ))
        })
    }

    /// Whether a selector names a job
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Job names in listing order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Jobs in listing order
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.order.iter().filter_map(|name| self.jobs.get(name))
    }
}

fn describe_query(name: &str) -> String {
    match name {
        "applications_received" => "Permit applications received per type, sub code and day",
        "active_permits" => "Active permits per folder type",
        "issued_permits" => "Permits issued per type, sub code and day",
        _ => "Replica query",
    }
    .to_string()
}
