//! Delimited payloads fetched over HTTP

use super::types::{Extract, Extractor};
use crate::decode::DecoderConfig;
use crate::error::Result;
use crate::http::HttpClient;
use async_trait::async_trait;
use tracing::{debug, info};

/// GETs an export and decodes it, header line first
#[derive(Debug, Clone)]
pub struct DelimitedExtractor {
    name: String,
    url: String,
    decoder: DecoderConfig,
    client: HttpClient,
}

impl DelimitedExtractor {
    /// Create an extractor for one endpoint
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        decoder: DecoderConfig,
        client: HttpClient,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            decoder,
            client,
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Extractor for DelimitedExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self) -> Result<Vec<Extract>> {
        debug!("Fetching {}", self.url);

        let body = self
            .client
            .get_bytes(&self.url)
            .await
            .map_err(|e| e.into_source_unavailable(&self.name))?;
        let table = self.decoder.decode_bytes(&body)?;

        info!("Extracted {} rows from '{}'", table.len(), self.name);
        Ok(vec![Extract::new(table)])
    }
}
