//! Load types

use crate::error::Result;
use crate::record::CanonicalRecord;
use crate::types::{LoadMode, ObjectFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a registry job writes its records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    /// One artifact named `<name>.<ext>` in object storage
    ObjectStorage {
        /// Artifact name without suffix
        name: String,
        /// Serialization
        format: ObjectFormat,
    },
    /// A catalog dataset
    Catalog {
        /// Logical dataset name resolved through `catalog.datasets`
        dataset: String,
        /// Upsert or replace
        mode: LoadMode,
    },
}

impl Destination {
    /// Short description for listings
    pub fn describe(&self) -> String {
        match self {
            Destination::ObjectStorage { name, format } => {
                format!("object storage {name}.{}", format.extension())
            }
            Destination::Catalog { dataset, mode } => format!("catalog {mode} {dataset}"),
        }
    }
}

/// Row counts reported by a destination
///
/// Catalog loads fill the counts from the catalog's own response, which
/// is also kept verbatim. Object-storage loads count every written row as
/// created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadResult {
    /// Records handed to the destination
    pub submitted: usize,
    /// Rows created
    pub created: u64,
    /// Rows updated
    pub updated: u64,
    /// Rows deleted
    pub deleted: u64,
    /// Rows the destination rejected
    pub errors: u64,
    /// Object location, for object-storage loads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Destination response body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl LoadResult {
    /// Rows the destination accepted
    pub fn accepted(&self) -> u64 {
        self.created + self.updated
    }

    /// Submitted rows neither accepted nor rejected
    pub fn ignored(&self) -> u64 {
        (self.submitted as u64).saturating_sub(self.accepted() + self.errors)
    }

    /// Add another partial result, for destinations written more than once
    pub fn merge(&mut self, other: LoadResult) {
        self.submitted += other.submitted;
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.errors += other.errors;
        if other.location.is_some() {
            self.location = other.location;
        }
        if other.response.is_some() {
            self.response = other.response;
        }
    }
}

/// Trait implemented by every destination
///
/// A loader sends the record set once. It does not retry and does not roll
/// back; whatever the destination reports is returned to the caller.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Destination description for logs
    fn destination(&self) -> String;

    /// Write the records
    async fn load(&self, records: &[CanonicalRecord]) -> Result<LoadResult>;
}
