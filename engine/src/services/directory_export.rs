//! Directory exporters
//!
//! The HTTP exporter speaks an upsert contract: `POST {endpoint}/{table}` with
//! `{ performUpsert: { fieldsToMergeOn: [merge_field] }, records: [{ fields }], typecast: true }`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::MAX_EXPORT_TIMEOUT;
use crate::error::{EngineError, EngineResult};
use crate::traits::{DirectoryExporter, DirectoryRecord};

pub struct HttpDirectoryExporter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpDirectoryExporter {
    /// `timeout` is capped so a slow directory never holds a request open for long
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout.min(MAX_EXPORT_TIMEOUT))
            .build()
            .map_err(|e| EngineError::Export { message: e.to_string() })?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl DirectoryExporter for HttpDirectoryExporter {
    async fn export(&self, record: DirectoryRecord) -> EngineResult<()> {
        let url = format!("{}/{}", self.endpoint, record.table);
        let body = serde_json::json!({
            "performUpsert": { "fieldsToMergeOn": [record.merge_field] },
            "records": [{ "fields": record.fields }],
            "typecast": true
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Export { message: e.to_string() })?;

        if !response.status().is_success() {
            return Err(EngineError::Export {
                message: format!("{url} answered {}", response.status()),
            });
        }

        debug!(table = %record.table, "Directory record exported");
        Ok(())
    }
}

/// Used when no directory endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

#[async_trait]
impl DirectoryExporter for NoopExporter {
    async fn export(&self, _record: DirectoryRecord) -> EngineResult<()> {
        Ok(())
    }
}
