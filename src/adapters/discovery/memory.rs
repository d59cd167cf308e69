//! In-memory discovery store

use super::mds::discovery_record;
use super::{DiscoveryStore, StudySummary};
use crate::adapters::memory::{CallRecorder, FaultPlan};
use crate::domain::{ProjectId, Result, StoreError, StoreKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Summaries held in memory
#[derive(Default)]
pub struct MemoryDiscoveryStore {
    records: Mutex<BTreeMap<String, Value>>,
    faults: FaultPlan,
    recorder: CallRecorder,
}

impl MemoryDiscoveryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into `recorder`
    pub fn with_recorder(mut self, recorder: CallRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Stored record
    pub async fn record(&self, project_id: &ProjectId) -> Option<Value> {
        self.records.lock().await.get(&project_id.to_string()).cloned()
    }

    /// Seeds a summary without recording a call
    pub async fn seed(&self, project_id: &ProjectId, summary: &StudySummary) {
        self.records
            .lock()
            .await
            .insert(project_id.to_string(), discovery_record(project_id, summary));
    }

    /// Failure injection for `publish`, `get` and `delete`
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }
}

#[async_trait]
impl DiscoveryStore for MemoryDiscoveryStore {
    async fn publish(&self, project_id: &ProjectId, summary: &StudySummary, overwrite: bool) -> Result<()> {
        self.recorder
            .record(format!("discovery.publish {project_id}"))
            .await;
        self.faults.check(StoreKind::Discovery, "publish").await?;

        let mut records = self.records.lock().await;
        let key = project_id.to_string();
        if records.contains_key(&key) && !overwrite {
            return Err(StoreError::write(
                StoreKind::Discovery,
                format!("{project_id} already has a summary"),
            )
            .into());
        }
        records.insert(key, discovery_record(project_id, summary));
        Ok(())
    }

    async fn get(&self, project_id: &ProjectId) -> Result<Option<Value>> {
        self.recorder
            .record(format!("discovery.get {project_id}"))
            .await;
        self.faults.check(StoreKind::Discovery, "get").await?;
        Ok(self.record(project_id).await)
    }

    async fn delete(&self, project_id: &ProjectId) -> Result<()> {
        self.recorder
            .record(format!("discovery.delete {project_id}"))
            .await;
        self.faults.check(StoreKind::Discovery, "delete").await?;
        self.records.lock().await.remove(&project_id.to_string());
        Ok(())
    }
}
