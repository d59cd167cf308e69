//! In-memory document store

use super::{resources_from_canonical, write_resources, DocumentStore, StoredResource};
use crate::adapters::memory::{CallRecorder, FaultPlan};
use crate::domain::{JobLog, Manifest, ProjectId, Result, StoreKind};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::Mutex;

/// Documents held in memory, keyed by project then id
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<String, BTreeMap<String, StoredResource>>>,
    faults: FaultPlan,
    recorder: CallRecorder,
}

impl MemoryDocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Resource ids held for the project
    pub async fn ids(&self, project_id: &ProjectId) -> BTreeSet<String> {
        self.documents
            .lock()
            .await
            .get(&project_id.to_string())
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Seeds resources of `resource_type` with bare ids
    pub async fn seed<I, S>(&self, project_id: &ProjectId, resource_type: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut documents = self.documents.lock().await;
        let project = documents.entry(project_id.to_string()).or_default();
        for id in ids {
            let id = id.into();
            project.insert(
                id.clone(),
                StoredResource {
                    resource: json!({ "resourceType": resource_type, "id": id }),
                    id,
                    resource_type: resource_type.to_string(),
                },
            );
        }
    }

    /// Failure injection for `put`, `get`, `delete` and `refresh`
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, project_id: &ProjectId, canonical_dir: &Path) -> Result<JobLog> {
        self.recorder
            .record(format!("documents.put {project_id}"))
            .await;
        self.faults.check(StoreKind::Documents, "put").await?;

        let resources = resources_from_canonical(canonical_dir)?;
        let mut log = JobLog::new();
        log.info(format!(
            "loaded {} resources into the document store",
            resources.len()
        ));

        let mut documents = self.documents.lock().await;
        let project = documents.entry(project_id.to_string()).or_default();
        for stored in resources {
            project.insert(stored.id.clone(), stored);
        }
        Ok(log)
    }

    async fn get(&self, project_id: &ProjectId, dest_dir: &Path) -> Result<JobLog> {
        self.recorder
            .record(format!("documents.get {project_id}"))
            .await;
        self.faults.check(StoreKind::Documents, "get").await?;

        let resources: Vec<StoredResource> = self
            .documents
            .lock()
            .await
            .get(&project_id.to_string())
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        write_resources(dest_dir, resources)
    }

    async fn delete(&self, project_id: &ProjectId) -> Result<u64> {
        self.recorder
            .record(format!("documents.delete {project_id}"))
            .await;
        self.faults.check(StoreKind::Documents, "delete").await?;

        let removed = self
            .documents
            .lock()
            .await
            .remove(&project_id.to_string())
            .map(|docs| docs.len())
            .unwrap_or(0);
        Ok(removed as u64)
    }

    async fn delete_not_in_manifest(&self, project_id: &ProjectId, manifest: &Manifest) -> Result<u64> {
        self.recorder
            .record(format!("documents.delete_not_in_manifest {project_id}"))
            .await;
        self.faults.check(StoreKind::Documents, "delete").await?;

        let mut documents = self.documents.lock().await;
        let Some(project) = documents.get_mut(&project_id.to_string()) else {
            return Ok(0);
        };
        let before = project.len();
        project.retain(|id, _| manifest.contains(id));
        Ok((before - project.len()) as u64)
    }

    async fn refresh(&self) -> Result<()> {
        self.recorder.record("documents.refresh").await;
        self.faults.check(StoreKind::Documents, "refresh").await
    }
}
