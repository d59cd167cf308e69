//! Snapshot of a project's document store, uploaded as a zip object

use super::checksum::checksum_file;
use crate::adapters::archive::Archiver;
use crate::adapters::discovery::DiscoveryStore;
use crate::adapters::documents::DocumentStore;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::Collaborators;
use crate::core::authz::{authorize, OperationKind};
use crate::core::materialize::WorkingArea;
use crate::domain::{ActorProfile, EtlError, JobLog, ProjectId, Result};
use chrono::{DateTime, TimeZone};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Uploaded snapshot, `None` when refused or failed
    pub object_id: Option<String>,
    pub log: JobLog,
}

/// `{project_id}_{YYYYmmdd-HHMMSS}_SNAPSHOT.zip`
pub fn snapshot_file_name<Tz>(project_id: &ProjectId, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{project_id}_{}_SNAPSHOT.zip", at.format("%Y%m%d-%H%M%S"))
}

/// Exports project documents to the bucket
pub struct SnapshotExporter {
    object_store: Arc<dyn ObjectStore + Send + Sync>,
    documents: Arc<dyn DocumentStore + Send + Sync>,
    discovery: Arc<dyn DiscoveryStore + Send + Sync>,
    archiver: Arc<dyn Archiver + Send + Sync>,
    studies_root: PathBuf,
}

impl SnapshotExporter {
    /// Creates an exporter staging its files under `studies_root`
    pub fn new(collaborators: &Collaborators, studies_root: impl Into<PathBuf>) -> Self {
        Self {
            object_store: Arc::clone(&collaborators.object_store),
            documents: Arc::clone(&collaborators.documents),
            discovery: Arc::clone(&collaborators.discovery),
            archiver: Arc::clone(&collaborators.archiver),
            studies_root: studies_root.into(),
        }
    }

    /// Exports `project_id` if `profile` may read it
    ///
    /// A refusal makes no store call. Store failures are logged with their trace
    /// and yield no object id.
    pub async fn export(&self, project_id: &ProjectId, profile: &ActorProfile) -> ExportReport {
        let mut log = JobLog::new();

        let decision = authorize(project_id, OperationKind::Read, profile);
        log.append(decision.trace);
        if !decision.granted {
            log.warn(format!("No read permissions on {project_id}"));
            return ExportReport {
                object_id: None,
                log,
            };
        }

        let area = WorkingArea::new(&self.studies_root, project_id);
        let outcome = self.snapshot(project_id, &area, &mut log).await;

        if let Err(e) = area.cleanup() {
            tracing::warn!(path = %area.root().display(), error = %e, "Failed to remove export tree");
        }

        let object_id = match outcome {
            Ok(object_id) => Some(object_id),
            Err(e) => {
                log.exception(format!("exporting {project_id}"), e);
                None
            }
        };
        ExportReport { object_id, log }
    }

    async fn snapshot(&self, project_id: &ProjectId, area: &WorkingArea, log: &mut JobLog) -> Result<String> {
        let export_dir = area.export_dir();
        std::fs::create_dir_all(&export_dir)?;

        self.documents.refresh().await?;
        log.append(self.documents.get(project_id, &export_dir).await?);

        match self.discovery.get(project_id).await? {
            Some(_) => log.info(format!("found discovery summary for {project_id}")),
            None => log.info(format!("no discovery summary for {project_id}")),
        }

        let file_name = snapshot_file_name(project_id, &chrono::Local::now());
        let archive = area.root().join(&file_name);
        let packed = self.pack(&export_dir, &archive).await?;
        let sha256 = checksum_file(&archive)?;
        tracing::info!(archive = %archive.display(), files = packed, sha256 = %sha256, "Packed snapshot");

        let metadata = json!({
            "submitter": null,
            "metadata_version": "0.0.1",
            "is_metadata": true,
            "is_snapshot": true,
            "sha256": sha256,
        });
        let receipt = self
            .object_store
            .upload(&archive, project_id, &metadata, &file_name)
            .await?;
        log.info(receipt.message);
        Ok(receipt.object_id)
    }

    async fn pack(&self, source: &Path, archive: &Path) -> Result<usize> {
        let archiver = Arc::clone(&self.archiver);
        let (source, archive) = (source.to_path_buf(), archive.to_path_buf());
        tokio::task::spawn_blocking(move || archiver.create(&source, &archive))
            .await
            .map_err(|e| EtlError::Expansion(format!("archive task failed: {e}")))?
    }
}
