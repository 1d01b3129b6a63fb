//! Object-storage artifacts

use super::types::{LoadResult, Loader};
use crate::error::Result;
use crate::output::{write_csv, write_parquet, ObjectStorage, ParquetWriterConfig};
use crate::record::CanonicalRecord;
use crate::types::ObjectFormat;
use async_trait::async_trait;
use tracing::info;

/// Serializes the record set to one object named after the source
#[derive(Debug, Clone)]
pub struct ObjectStoreLoader {
    storage: ObjectStorage,
    name: String,
    format: ObjectFormat,
    parquet: ParquetWriterConfig,
}

impl ObjectStoreLoader {
    /// Create a loader writing `<name>.<ext>`
    pub fn new(storage: ObjectStorage, name: impl Into<String>, format: ObjectFormat) -> Self {
        Self {
            storage,
            name: name.into(),
            format,
            parquet: ParquetWriterConfig::default(),
        }
    }

    /// Override Parquet writer settings
    #[must_use]
    pub fn with_parquet_config(mut self, config: ParquetWriterConfig) -> Self {
        self.parquet = config;
        self
    }

    /// Object key written by this loader
    pub fn key(&self) -> String {
        format!("{}.{}", self.name, self.format.extension())
    }
}

#[async_trait]
impl Loader for ObjectStoreLoader {
    fn destination(&self) -> String {
        format!("{}://{}", self.storage.scheme(), self.key())
    }

    async fn load(&self, records: &[CanonicalRecord]) -> Result<LoadResult> {
        let data = match self.format {
            ObjectFormat::Csv => write_csv(records)?,
            ObjectFormat::Parquet => write_parquet(records, &self.parquet)?,
        };

        let location = self.storage.put(&self.key(), data).await?;
        info!("Uploaded {} rows to {}", records.len(), location);

        Ok(LoadResult {
            submitted: records.len(),
            created: records.len() as u64,
            location: Some(location),
            ..LoadResult::default()
        })
    }
}
