//! Object storage handle (S3-compatible or local filesystem)

use crate::config::ObjectStoreConfig;
use crate::error::{Error, Result, ResultExt};
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;

/// A bucket (or directory) plus an optional key prefix
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket
    prefix: String,
    /// URL scheme for logging
    scheme: String,
    /// Bucket name or local root for logging
    root: String,
}

impl ObjectStorage {
    /// Build a storage handle from explicit configuration
    ///
    /// Supported URLs:
    /// - `s3://bucket/prefix` - AWS S3 or an S3-compatible endpoint
    /// - `/local/path`, `./path` or `file:///path` - local filesystem
    pub fn from_config(config: &ObjectStoreConfig) -> Result<Self> {
        if let Some(without_scheme) = config.url.strip_prefix("s3://") {
            Self::s3(without_scheme, config)
        } else {
            Self::local(&config.url)
        }
    }

    /// Wrap an existing store, mostly for tests
    pub fn with_store(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into().trim_matches('/').to_string(),
            scheme: "memory".to_string(),
            root: String::new(),
        }
    }

    fn s3(without_scheme: &str, config: &ObjectStoreConfig) -> Result<Self> {
        let (bucket, prefix) = match without_scheme.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix.trim_matches('/').to_string()),
            None => (without_scheme, String::new()),
        };

        if bucket.is_empty() {
            return Err(Error::InvalidConfigValue {
                field: "object_store.url".to_string(),
                message: format!("no bucket in '{}'", config.url),
            });
        }

        // Credentials come only from configuration, never the environment
        let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
        if let Some(ref key) = config.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = config.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(ref region) = config.region {
            builder = builder.with_region(region);
        }
        if let Some(ref endpoint) = config.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create s3 client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix,
            scheme: "s3".to_string(),
            root: bucket.to_string(),
        })
    }

    fn local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path).with_context(|| format!("Failed to create directory {path}"))?;
        let store = LocalFileSystem::new_with_prefix(path).context("Failed to create local store")?;

        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
            scheme: "file".to_string(),
            root: path.trim_end_matches('/').to_string(),
        })
    }

    /// Get the scheme (s3, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    fn full_path(&self, key: &str) -> ObjectPath {
        if self.prefix.is_empty() {
            ObjectPath::from(key)
        } else {
            ObjectPath::from(format!("{}/{key}", self.prefix))
        }
    }

    fn display(&self, path: &ObjectPath) -> String {
        if self.root.is_empty() {
            format!("{}://{path}", self.scheme)
        } else {
            format!("{}://{}/{path}", self.scheme, self.root)
        }
    }

    /// Write an object, returning its full location for logging
    pub async fn put(&self, key: &str, data: Bytes) -> Result<String> {
        let path = self.full_path(key);
        self.store.put(&path, data.into()).await?;
        Ok(self.display(&path))
    }

    /// Read a whole object
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.full_path(key);
        let result = self.store.get(&path).await?;
        Ok(result.bytes().await?)
    }

    /// Keys under `prefix`, relative to the storage prefix, sorted
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let search = self.full_path(prefix.trim_end_matches('/'));
        let objects: Vec<_> = self.store.list(Some(&search)).try_collect().await?;

        let strip = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };

        let mut keys: Vec<String> = objects
            .into_iter()
            .map(|meta| {
                let location = meta.location.to_string();
                location
                    .strip_prefix(&strip)
                    .map_or(location.clone(), str::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}
