//! Graph metadata store

pub mod memory;
pub mod sheepdog;

pub use memory::MemoryGraphStore;
pub use sheepdog::SheepdogGraphStore;

use crate::domain::{Manifest, ProjectId, Result, SchemaRef};
use async_trait::async_trait;
use std::path::Path;

/// Graph of project records and their relations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Submits every record of the canonical set in `canonical_dir`
    ///
    /// Returns the number of records written.
    async fn upload(
        &self,
        project_id: &ProjectId,
        canonical_dir: &Path,
        schema: &SchemaRef,
    ) -> Result<usize>;

    /// Removes project records
    ///
    /// Without a manifest every record of the project is removed. With one, only
    /// records whose id is not in the manifest are removed and the rest are kept.
    /// Returns the number of records removed.
    async fn empty(
        &self,
        project_id: &ProjectId,
        schema: &SchemaRef,
        manifest: Option<&Manifest>,
    ) -> Result<usize>;
}
