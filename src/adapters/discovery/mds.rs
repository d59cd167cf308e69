//! Discovery store backed by the metadata service (`/mds/metadata/{guid}`)
//!
//! The project id is the record GUID.

use super::{DiscoveryStore, StudySummary};
use crate::adapters::http::{check_status, connection_error, read_json, HttpClient};
use crate::domain::{EtlError, ProjectId, Result, StoreError, StoreKind};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

/// Discovery records in the metadata service
pub struct MetadataDiscoveryStore {
    http: HttpClient,
}

impl MetadataDiscoveryStore {
    /// Creates a store over `http`
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn path(project_id: &ProjectId) -> String {
        format!("/mds/metadata/{project_id}")
    }
}

/// Metadata-service record for a summary
pub fn discovery_record(project_id: &ProjectId, summary: &StudySummary) -> Value {
    json!({
        "_guid_type": "discovery_metadata",
        "gen3_discovery": {
            "project_id": project_id.to_string(),
            "authz": project_id.resource_path(),
            "_subjects_count": summary.patient_count,
            "description": summary.description,
            "identifiers": summary.identifiers,
        }
    })
}

#[async_trait]
impl DiscoveryStore for MetadataDiscoveryStore {
    async fn publish(&self, project_id: &ProjectId, summary: &StudySummary, overwrite: bool) -> Result<()> {
        let path = Self::path(project_id);
        let record = discovery_record(project_id, summary);
        let overwrite = overwrite.to_string();
        self.http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::POST, &path)
                    .query(&[("overwrite", overwrite.as_str())])
                    .json(&record)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::Discovery, e))?;
                check_status(StoreKind::Discovery, response).await
            })
            .await?;
        tracing::info!(project_id = %project_id, patients = summary.patient_count, "Published discovery summary");
        Ok(())
    }

    async fn get(&self, project_id: &ProjectId) -> Result<Option<Value>> {
        let path = Self::path(project_id);
        let outcome = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::GET, &path)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::Discovery, e))?;
                check_status(StoreKind::Discovery, response).await
            })
            .await;
        match outcome {
            Ok(response) => Ok(Some(read_json(StoreKind::Discovery, response).await?)),
            Err(EtlError::Store(StoreError::UnexpectedStatus { status: 404, .. })) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, project_id: &ProjectId) -> Result<()> {
        let response = self
            .http
            .request(Method::DELETE, &Self::path(project_id))
            .send()
            .await
            .map_err(|e| connection_error(StoreKind::Discovery, e))?;
        check_status(StoreKind::Discovery, response).await?;
        Ok(())
    }
}
