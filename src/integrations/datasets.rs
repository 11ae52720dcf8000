//! data.gov.sg datastore client, the dataset fetch gateway.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::{Config, DEFAULT_DATASETS_BASE_URL};
use crate::gateways::DatasetSource;
use crate::{Error, Result};

/// Client for `GET /api/action/datastore_search?resource_id=<id>`.
#[derive(Debug, Clone)]
pub struct DataGovClient {
    http: Client,
    base_url: String,
}

impl DataGovClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("dataset_chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.datasets_base_url)
    }

    /// Datastore search endpoint; the dataset id goes in the query string.
    pub fn search_url(&self) -> String {
        format!("{}/api/action/datastore_search", self.base_url)
    }
}

impl Default for DataGovClient {
    fn default() -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_DATASETS_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl DatasetSource for DataGovClient {
    async fn fetch(&self, dataset_id: &str) -> Result<String> {
        if dataset_id.trim().is_empty() {
            return Err(Error::InvalidArgument("empty dataset id".to_string()));
        }

        let url = self.search_url();
        debug!(%url, dataset_id, "Fetching dataset");

        let response = self
            .http
            .get(&url)
            .query(&[("resource_id", dataset_id)])
            .send()
            .await
            .map_err(|e| Error::DatasetFetch(format!("{}: request failed: {}", dataset_id, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                Error::DatasetFetch(format!("{}: failed to read body: {}", dataset_id, e))
            })?;

        if !status.is_success() {
            return Err(Error::DatasetFetch(format!("{}: status {}", dataset_id, status)));
        }

        info!(dataset_id, bytes = body.len(), "Dataset fetched");
        Ok(body)
    }
}
