//! Open-data catalog upsert and replace
//!
//! Both modes send the whole record set as one JSON array to
//! `{base_url}/resource/{dataset}.json`: `POST` merges by the catalog's own
//! row identity, `PUT` swaps the dataset's content. Bulk calls on large
//! datasets are slow, so the client timeout is long (15 minutes unless
//! configured).

use super::types::{LoadResult, Loader};
use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::record::CanonicalRecord;
use crate::types::LoadMode;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// App token header
pub const APP_TOKEN_HEADER: &str = "X-App-Token";

/// Counts in a successful catalog response
#[derive(Debug, Default, Deserialize)]
struct CatalogResponse {
    #[serde(rename = "Rows Created", default)]
    rows_created: u64,
    #[serde(rename = "Rows Updated", default)]
    rows_updated: u64,
    #[serde(rename = "Rows Deleted", default)]
    rows_deleted: u64,
    #[serde(rename = "Errors", default)]
    errors: u64,
}

/// Writes records into one catalog dataset
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    client: HttpClient,
    dataset_id: String,
    mode: LoadMode,
}

impl CatalogLoader {
    /// Create a loader for a dataset identifier
    pub fn new(config: &CatalogConfig, dataset_id: impl Into<String>, mode: LoadMode) -> Result<Self> {
        let mut builder = HttpClientConfig::builder()
            .base_url(config.base_url.clone())
            .timeout(Duration::from_secs(config.timeout_secs));

        if let Some(ref token) = config.app_token {
            builder = builder.header(APP_TOKEN_HEADER, token.clone());
        }
        if let Some(ref username) = config.username {
            builder = builder.basic_auth(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        Ok(Self {
            client: HttpClient::with_config(builder.build())?,
            dataset_id: dataset_id.into(),
            mode,
        })
    }

    /// Resource path of the dataset
    pub fn resource_path(&self) -> String {
        format!("/resource/{}.json", self.dataset_id)
    }

    /// Load mode
    pub fn mode(&self) -> LoadMode {
        self.mode
    }
}

#[async_trait]
impl Loader for CatalogLoader {
    fn destination(&self) -> String {
        format!("catalog {} {}", self.mode, self.dataset_id)
    }

    async fn load(&self, records: &[CanonicalRecord]) -> Result<LoadResult> {
        let method = match self.mode {
            LoadMode::Upsert => Method::POST,
            LoadMode::Replace => Method::PUT,
        };

        if self.mode == LoadMode::Replace && records.is_empty() {
            warn!("Replacing dataset {} with an empty record set", self.dataset_id);
        }

        let body = serde_json::to_value(records)?;
        let response: Value = self
            .client
            .request_json(method, &self.resource_path(), RequestConfig::new().json(body))
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => Error::destination_rejected(status, body),
                other => other,
            })?;

        info!("Catalog {} response for {}: {}", self.mode, self.dataset_id, response);

        let counts: CatalogResponse = serde_json::from_value(response.clone()).unwrap_or_default();
        if counts.errors > 0 {
            warn!(
                "Catalog reported {} row errors for {}",
                counts.errors, self.dataset_id
            );
        }

        Ok(LoadResult {
            submitted: records.len(),
            created: counts.rows_created,
            updated: counts.rows_updated,
            deleted: counts.rows_deleted,
            errors: counts.errors,
            location: None,
            response: Some(response),
        })
    }
}
