//! In-memory flat indices

use super::SearchIndex;
use crate::adapters::memory::{CallRecorder, FaultPlan};
use crate::domain::canonical::read_ndjson;
use crate::domain::{EtlError, Manifest, ProjectId, ResourceType, Result, SchemaRef, StoreKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::sync::Mutex;

type IndexKey = (String, String);

/// Flat indices held in memory, keyed by `(project, index)`
#[derive(Default)]
pub struct MemorySearchIndex {
    indices: Mutex<BTreeMap<IndexKey, BTreeMap<String, Value>>>,
    faults: FaultPlan,
    recorder: CallRecorder,
}

impl MemorySearchIndex {
    /// Creates empty indices
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Document ids of the project in `index`
    pub async fn ids(&self, project_id: &ProjectId, index: &str) -> BTreeSet<String> {
        self.indices
            .lock()
            .await
            .get(&(project_id.to_string(), index.to_string()))
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored document
    pub async fn document(&self, project_id: &ProjectId, index: &str, id: &str) -> Option<Value> {
        self.indices
            .lock()
            .await
            .get(&(project_id.to_string(), index.to_string()))
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Seeds bare documents
    pub async fn seed<I, S>(&self, project_id: &ProjectId, index: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indices = self.indices.lock().await;
        let docs = indices
            .entry((project_id.to_string(), index.to_string()))
            .or_default();
        for id in ids {
            let id = id.into();
            docs.insert(id.clone(), serde_json::json!({ "id": id }));
        }
    }

    /// Failure injection for `load`, `delete`, `count` and `refresh`
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn load(
        &self,
        project_id: &ProjectId,
        index: &str,
        path: Option<&Path>,
        _schema: &SchemaRef,
    ) -> Result<usize> {
        let payload = if path.is_some() { "file" } else { "empty" };
        self.recorder
            .record(format!("search.load {project_id} {index} {payload}"))
            .await;
        self.faults.check(StoreKind::Search, "load").await?;

        let documents = match path {
            Some(path) => read_ndjson(path)?,
            None => Vec::new(),
        };
        let mut indices = self.indices.lock().await;
        let docs = indices
            .entry((project_id.to_string(), index.to_string()))
            .or_default();
        for document in &documents {
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| EtlError::Serialization("flat document without an id".to_string()))?;
            docs.insert(id.to_string(), document.clone());
        }
        Ok(documents.len())
    }

    async fn delete(&self, project_id: &ProjectId, index: &str) -> Result<u64> {
        self.recorder
            .record(format!("search.delete {project_id} {index}"))
            .await;
        self.faults.check(StoreKind::Search, "delete").await?;

        let removed = self
            .indices
            .lock()
            .await
            .remove(&(project_id.to_string(), index.to_string()))
            .map(|docs| docs.len())
            .unwrap_or(0);
        Ok(removed as u64)
    }

    async fn delete_not_in_manifest(
        &self,
        project_id: &ProjectId,
        manifest: &Manifest,
        index: Option<&str>,
    ) -> Result<u64> {
        self.recorder
            .record(format!(
                "search.delete_not_in_manifest {project_id} {}",
                index.unwrap_or("*")
            ))
            .await;
        self.faults.check(StoreKind::Search, "delete").await?;

        let targets: Vec<&str> = match index {
            Some(index) => vec![index],
            None => ResourceType::index_names().collect(),
        };
        let mut indices = self.indices.lock().await;
        let mut removed = 0;
        for index in targets {
            if let Some(docs) = indices.get_mut(&(project_id.to_string(), index.to_string())) {
                let before = docs.len();
                docs.retain(|id, _| manifest.contains(id));
                removed += (before - docs.len()) as u64;
            }
        }
        Ok(removed)
    }

    async fn count(&self, project_id: &ProjectId, index: &str) -> Result<u64> {
        self.recorder
            .record(format!("search.count {project_id} {index}"))
            .await;
        self.faults.check(StoreKind::Search, "count").await?;
        Ok(self.ids(project_id, index).await.len() as u64)
    }

    async fn refresh(&self) -> Result<()> {
        self.recorder.record("search.refresh").await;
        self.faults.check(StoreKind::Search, "refresh").await
    }
}
