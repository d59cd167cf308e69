//! Object store client: bucket downloads and snapshot uploads

pub mod fence;
pub mod memory;

pub use fence::FenceObjectStore;
pub use memory::{MemoryObjectStore, UploadedObject};

use crate::domain::{ObjectId, ProjectId, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Outcome of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Identifier of the new object
    pub object_id: String,
    /// Human-readable message for the job log
    pub message: String,
}

/// Project bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads `object_id` to `destination`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::EtlError::Download`] on any transport or lookup failure.
    async fn download(&self, object_id: &ObjectId, destination: &Path) -> Result<PathBuf>;

    /// Uploads the file at `path` into the project's bucket as `file_name`,
    /// attaching `metadata`
    ///
    /// # Errors
    ///
    /// Returns a store error if the upload is rejected.
    async fn upload(
        &self,
        path: &Path,
        project_id: &ProjectId,
        metadata: &Value,
        file_name: &str,
    ) -> Result<UploadReceipt>;
}
