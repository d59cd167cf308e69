//! Flat search index: one index per indexed resource type

pub mod elastic;
pub mod memory;

pub use elastic::ElasticSearchIndex;
pub use memory::MemorySearchIndex;

use crate::domain::{Manifest, ProjectId, Result, SchemaRef};
use async_trait::async_trait;
use std::path::Path;

/// Per-type flat indices (`patient`, `observation`, `file`)
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Loads the ndjson documents at `path` into `index` for the project
    ///
    /// `None` loads an explicit empty payload: the index is created if needed and
    /// nothing is written. Returns the number of documents written.
    async fn load(
        &self,
        project_id: &ProjectId,
        index: &str,
        path: Option<&Path>,
        schema: &SchemaRef,
    ) -> Result<usize>;

    /// Deletes every project document from `index`
    async fn delete(&self, project_id: &ProjectId, index: &str) -> Result<u64>;

    /// Deletes project documents whose id is not in `manifest`, from `index` or,
    /// when `None`, from every flat index
    async fn delete_not_in_manifest(
        &self,
        project_id: &ProjectId,
        manifest: &Manifest,
        index: Option<&str>,
    ) -> Result<u64>;

    /// Number of project documents in `index`
    async fn count(&self, project_id: &ProjectId, index: &str) -> Result<u64>;

    /// Makes recent writes to the flat indices searchable
    async fn refresh(&self) -> Result<()>;
}
