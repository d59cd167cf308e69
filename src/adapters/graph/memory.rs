//! In-memory graph store

use super::GraphStore;
use crate::adapters::memory::{CallRecorder, FaultPlan};
use crate::domain::canonical::read_canonical_dir;
use crate::domain::{CanonicalRecord, Manifest, ProjectId, Result, SchemaRef, StoreKind};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::Mutex;

/// Graph held in memory, keyed by project then record id
#[derive(Default)]
pub struct MemoryGraphStore {
    nodes: Mutex<BTreeMap<String, BTreeMap<String, CanonicalRecord>>>,
    faults: FaultPlan,
    recorder: CallRecorder,
}

impl MemoryGraphStore {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Record ids held for `project_id`
    pub async fn ids(&self, project_id: &ProjectId) -> BTreeSet<String> {
        self.nodes
            .lock()
            .await
            .get(&project_id.to_string())
            .map(|nodes| nodes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Seeds records for `project_id` with bare ids
    pub async fn seed<I, S>(&self, project_id: &ProjectId, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut nodes = self.nodes.lock().await;
        let project = nodes.entry(project_id.to_string()).or_default();
        for id in ids {
            let id = id.into();
            project.insert(
                id.clone(),
                CanonicalRecord {
                    id,
                    name: "seed".to_string(),
                    relations: Vec::new(),
                    object: serde_json::Value::Null,
                },
            );
        }
    }

    /// Failure injection for `upload` and `empty`
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upload(
        &self,
        project_id: &ProjectId,
        canonical_dir: &Path,
        _schema: &SchemaRef,
    ) -> Result<usize> {
        self.recorder
            .record(format!("graph.upload {project_id}"))
            .await;
        self.faults.check(StoreKind::Graph, "upload").await?;

        let records = read_canonical_dir(canonical_dir)?;
        let count = records.len();
        let mut nodes = self.nodes.lock().await;
        let project = nodes.entry(project_id.to_string()).or_default();
        for record in records {
            project.insert(record.id.clone(), record);
        }
        Ok(count)
    }

    async fn empty(
        &self,
        project_id: &ProjectId,
        _schema: &SchemaRef,
        manifest: Option<&Manifest>,
    ) -> Result<usize> {
        self.recorder
            .record(format!("graph.empty {project_id}"))
            .await;
        self.faults.check(StoreKind::Graph, "empty").await?;

        let mut nodes = self.nodes.lock().await;
        let Some(project) = nodes.get_mut(&project_id.to_string()) else {
            return Ok(0);
        };
        let before = project.len();
        match manifest {
            Some(manifest) => project.retain(|id, _| manifest.contains(id)),
            None => project.clear(),
        }
        Ok(before - project.len())
    }
}
