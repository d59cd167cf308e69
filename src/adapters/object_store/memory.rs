//! In-memory object store

use super::{ObjectStore, UploadReceipt};
use crate::adapters::memory::{CallRecorder, FaultPlan};
use crate::domain::{EtlError, ObjectId, ProjectId, Result, StoreKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// An object written through [`ObjectStore::upload`]
#[derive(Debug, Clone)]
pub struct UploadedObject {
    pub object_id: String,
    pub project_id: String,
    pub file_name: String,
    pub metadata: Value,
    pub bytes: Vec<u8>,
}

/// Bucket held in memory
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<UploadedObject>>,
    faults: FaultPlan,
    recorder: CallRecorder,
}

impl MemoryObjectStore {
    /// Creates an empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Stores `bytes` under `object_id`
    pub async fn insert(&self, object_id: impl Into<String>, bytes: Vec<u8>) {
        self.objects.lock().await.insert(object_id.into(), bytes);
    }

    /// Objects uploaded so far
    pub async fn uploads(&self) -> Vec<UploadedObject> {
        self.uploads.lock().await.clone()
    }

    /// Failure injection for `download` and `upload`
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, object_id: &ObjectId, destination: &Path) -> Result<PathBuf> {
        self.recorder
            .record(format!("object_store.download {object_id}"))
            .await;
        self.faults
            .check(StoreKind::ObjectStore, "download")
            .await
            .map_err(|e| EtlError::Download(format!("{object_id}: {e}")))?;

        let bytes = self
            .objects
            .lock()
            .await
            .get(object_id.as_str())
            .cloned()
            .ok_or_else(|| EtlError::Download(format!("{object_id}: object not found")))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, bytes).await?;
        Ok(destination.to_path_buf())
    }

    async fn upload(
        &self,
        path: &Path,
        project_id: &ProjectId,
        metadata: &Value,
        file_name: &str,
    ) -> Result<UploadReceipt> {
        self.recorder
            .record(format!("object_store.upload {project_id} {file_name}"))
            .await;
        self.faults.check(StoreKind::ObjectStore, "upload").await?;

        let bytes = tokio::fs::read(path).await?;
        let object_id = Uuid::new_v4().to_string();
        self.objects
            .lock()
            .await
            .insert(object_id.clone(), bytes.clone());
        self.uploads.lock().await.push(UploadedObject {
            object_id: object_id.clone(),
            project_id: project_id.to_string(),
            file_name: file_name.to_string(),
            metadata: metadata.clone(),
            bytes,
        });

        Ok(UploadReceipt {
            message: format!("Uploaded {file_name} to {project_id} as {object_id}"),
            object_id,
        })
    }
}
