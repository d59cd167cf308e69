//! Object store backed by signed URLs from the commons data endpoints
//!
//! Downloads resolve `GET /user/data/download/{guid}` to a signed URL and fetch it.
//! Uploads request a new GUID and signed URL from `POST /user/data/upload`, put the
//! bytes, then attach the metadata via `POST /mds/metadata/{guid}`.

use super::{ObjectStore, UploadReceipt};
use crate::adapters::http::{check_status, connection_error, read_json, HttpClient};
use crate::domain::{EtlError, ObjectId, ProjectId, Result, StoreError, StoreKind};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UploadTicket {
    guid: String,
    url: String,
}

/// Bucket access through signed URLs
pub struct FenceObjectStore {
    http: HttpClient,
}

impl FenceObjectStore {
    /// Creates a store over `http`
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch(&self, object_id: &ObjectId) -> Result<Vec<u8>> {
        let path = format!("/user/data/download/{}", object_id);
        let signed: SignedUrl = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::GET, &path)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
                let response = check_status(StoreKind::ObjectStore, response).await?;
                read_json(StoreKind::ObjectStore, response).await
            })
            .await?;

        self.http
            .retry_request(|| async {
                let response = self
                    .http
                    .request_url(Method::GET, &signed.url)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
                let response = check_status(StoreKind::ObjectStore, response).await?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
                Ok(bytes.to_vec())
            })
            .await
    }
}

#[async_trait]
impl ObjectStore for FenceObjectStore {
    async fn download(&self, object_id: &ObjectId, destination: &Path) -> Result<PathBuf> {
        let bytes = self
            .fetch(object_id)
            .await
            .map_err(|e| EtlError::Download(format!("{object_id}: {e}")))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|e| EtlError::Download(format!("{object_id}: {e}")))?;

        tracing::debug!(
            object_id = %object_id,
            bytes = bytes.len(),
            path = %destination.display(),
            "Downloaded object"
        );
        Ok(destination.to_path_buf())
    }

    async fn upload(
        &self,
        path: &Path,
        project_id: &ProjectId,
        metadata: &Value,
        file_name: &str,
    ) -> Result<UploadReceipt> {
        let bytes = tokio::fs::read(path).await?;
        let request_body = json!({
            "file_name": file_name,
            "authz": [project_id.resource_path()],
        });

        let ticket: UploadTicket = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::POST, "/user/data/upload")
                    .json(&request_body)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
                let response = check_status(StoreKind::ObjectStore, response).await?;
                read_json(StoreKind::ObjectStore, response).await
            })
            .await?;

        let response = self
            .http
            .request_url(Method::PUT, &ticket.url)
            .body(bytes.clone())
            .send()
            .await
            .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
        check_status(StoreKind::ObjectStore, response)
            .await
            .map_err(|e| StoreError::write(StoreKind::ObjectStore, format!("upload of {file_name}: {e}")))?;

        let mut record = json!({
            "_guid_type": "indexed_file_object",
            "project_id": project_id.to_string(),
            "file_name": file_name,
            "size": bytes.len(),
        });
        if let (Some(record), Some(extra)) = (record.as_object_mut(), metadata.as_object()) {
            for (key, value) in extra {
                record.insert(key.clone(), value.clone());
            }
        }

        let metadata_path = format!("/mds/metadata/{}", ticket.guid);
        let response = self
            .http
            .request(Method::POST, &metadata_path)
            .query(&[("overwrite", "true")])
            .json(&record)
            .send()
            .await
            .map_err(|e| connection_error(StoreKind::ObjectStore, e))?;
        check_status(StoreKind::ObjectStore, response).await?;

        Ok(UploadReceipt {
            message: format!("Uploaded {file_name} to {project_id} as {}", ticket.guid),
            object_id: ticket.guid,
        })
    }
}
