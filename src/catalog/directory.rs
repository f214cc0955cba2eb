//! Remote tool directory collaborator.
//!
//! Tier 1 can widen its candidate pool by querying an external directory
//! service. The directory is best-effort: transport failures degrade the
//! search to the local catalog and are recorded in the tier trace.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::ToolDescriptor;
use crate::config::DirectoryConfig;
use crate::errors::EngineError;

#[async_trait]
pub trait CatalogDirectory: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ToolDescriptor>, EngineError>;

    fn name(&self) -> &str {
        "directory"
    }
}

/// Wire shape returned by directory endpoints. Converted into a
/// [`ToolDescriptor`] rather than used directly so remote payload quirks
/// stay at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryToolRecord {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl DirectoryToolRecord {
    pub fn into_descriptor(self, fallback_provider: &str) -> ToolDescriptor {
        let mut descriptor = ToolDescriptor::new(
            &self.name,
            self.provider.as_deref().unwrap_or(fallback_provider),
            self.description.as_deref().unwrap_or(""),
        );
        descriptor.categories = self.categories;
        descriptor.capabilities = self.capabilities;
        if let Some(confidence) = self.confidence {
            descriptor.confidence_base = confidence.clamp(0.0, 1.0);
        }
        descriptor
    }
}

pub struct HttpCatalogDirectory {
    config: DirectoryConfig,
    client: reqwest::Client,
}

impl HttpCatalogDirectory {
    pub fn new(config: DirectoryConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EngineError::Directory(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn search_url(&self) -> String {
        format!("{}/tools/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CatalogDirectory for HttpCatalogDirectory {
    async fn search(&self, query: &str) -> Result<Vec<ToolDescriptor>, EngineError> {
        let limit = self.config.max_results.to_string();
        let mut request = self
            .client
            .get(self.search_url())
            .query(&[("q", query), ("limit", limit.as_str())]);
        if let Some(token) = &self.config.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Directory(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Directory(format!(
                "directory returned {}",
                status
            )));
        }

        let records: Vec<DirectoryToolRecord> = response
            .json()
            .await
            .map_err(|e| EngineError::Directory(format!("invalid payload: {}", e)))?;

        log::debug!(
            "[directory] {} records for query '{}'",
            records.len(),
            query
        );

        Ok(records
            .into_iter()
            .take(self.config.max_results)
            .map(|record| record.into_descriptor("directory"))
            .collect())
    }

    fn name(&self) -> &str {
        "http-directory"
    }
}
