//! FHIR document store

pub mod elastic;
pub mod memory;

pub use elastic::ElasticDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::domain::canonical::read_canonical_dir;
use crate::domain::resource::canonical_file_name;
use crate::domain::{JobLog, Manifest, ProjectId, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Store of the FHIR resources of every project
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores every resource of the canonical set in `canonical_dir`
    ///
    /// Returns the store's own log lines.
    async fn put(&self, project_id: &ProjectId, canonical_dir: &Path) -> Result<JobLog>;

    /// Writes the project's resources into `dest_dir` as `{ResourceType}.ndjson`
    async fn get(&self, project_id: &ProjectId, dest_dir: &Path) -> Result<JobLog>;

    /// Deletes every resource of the project
    async fn delete(&self, project_id: &ProjectId) -> Result<u64>;

    /// Deletes project resources whose id is not in `manifest`
    async fn delete_not_in_manifest(&self, project_id: &ProjectId, manifest: &Manifest) -> Result<u64>;

    /// Makes recent writes readable
    async fn refresh(&self) -> Result<()>;
}

/// A resource ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource {
    pub id: String,
    pub resource_type: String,
    pub resource: Value,
}

/// Resources of a canonical set, with the derived `identifier_coding` removed
///
/// # Errors
///
/// Returns an error if the canonical set cannot be read.
pub fn resources_from_canonical(canonical_dir: &Path) -> Result<Vec<StoredResource>> {
    let records = read_canonical_dir(canonical_dir)?;
    Ok(records
        .into_iter()
        .map(|record| {
            let resource_type = record
                .resource_type()
                .map(str::to_string)
                .unwrap_or_else(|| record.name.clone());
            let mut resource = record.object;
            if let Some(fields) = resource.as_object_mut() {
                fields.remove("identifier_coding");
            }
            StoredResource {
                id: record.id,
                resource_type,
                resource,
            }
        })
        .collect())
}

/// Writes resources grouped by type, sorted by id, one file per type
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn write_resources<I>(dest_dir: &Path, resources: I) -> Result<JobLog>
where
    I: IntoIterator<Item = StoredResource>,
{
    let mut by_type: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for stored in resources {
        by_type
            .entry(stored.resource_type)
            .or_default()
            .insert(stored.id, stored.resource);
    }

    std::fs::create_dir_all(dest_dir)?;
    let mut log = JobLog::new();
    for (resource_type, resources) in by_type {
        let path = dest_dir.join(canonical_file_name(&resource_type));
        let mut file = std::io::BufWriter::new(std::fs::File::create(&path)?);
        for resource in resources.values() {
            serde_json::to_writer(&mut file, resource)?;
            file.write_all(b"\n")?;
        }
        file.flush()?;
        log.info(format!(
            "wrote {} {resource_type} resources to {}",
            resources.len(),
            path.display()
        ));
    }
    Ok(log)
}
