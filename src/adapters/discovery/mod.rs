//! Discovery summary store

pub mod mds;
pub mod memory;

pub use mds::MetadataDiscoveryStore;
pub use memory::MemoryDiscoveryStore;

use crate::domain::{ProjectId, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary shown on the discovery page of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySummary {
    /// Patients in the project's patient index
    pub patient_count: u64,
    /// Research study description
    pub description: Option<String>,
    /// Research study identifiers, `system#value`
    pub identifiers: Vec<String>,
}

/// One summary per project
#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Publishes the project summary, replacing an existing one when `overwrite`
    async fn publish(&self, project_id: &ProjectId, summary: &StudySummary, overwrite: bool) -> Result<()>;

    /// Current summary record, if any
    async fn get(&self, project_id: &ProjectId) -> Result<Option<Value>>;

    /// Removes the project summary
    async fn delete(&self, project_id: &ProjectId) -> Result<()>;
}
