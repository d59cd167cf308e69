//! FHIR documents kept in one Elasticsearch index

use super::{resources_from_canonical, write_resources, DocumentStore, StoredResource};
use crate::adapters::elastic::{document_id, project_ids_query, project_query, ElasticClient};
use crate::domain::{JobLog, Manifest, ProjectId, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Document store backed by the FHIR index
pub struct ElasticDocumentStore {
    client: ElasticClient,
    index: String,
}

impl ElasticDocumentStore {
    /// Creates a store writing to `index`
    pub fn new(client: ElasticClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticDocumentStore {
    async fn put(&self, project_id: &ProjectId, canonical_dir: &Path) -> Result<JobLog> {
        let resources = resources_from_canonical(canonical_dir)?;
        self.client.ensure_index(&self.index).await?;

        let mut per_type: BTreeMap<&str, usize> = BTreeMap::new();
        let documents: Vec<(String, Value)> = resources
            .iter()
            .map(|stored| {
                *per_type.entry(stored.resource_type.as_str()).or_default() += 1;
                (
                    document_id(project_id, &stored.id),
                    json!({
                        "id": stored.id,
                        "project_id": project_id.to_string(),
                        "auth_resource_path": project_id.resource_path(),
                        "resource_type": stored.resource_type,
                        "resource": stored.resource,
                    }),
                )
            })
            .collect();
        self.client.bulk_index(&self.index, &documents).await?;

        let mut log = JobLog::new();
        for (resource_type, count) in per_type {
            log.info(format!("loaded {count} {resource_type} into {}", self.index));
        }
        Ok(log)
    }

    async fn get(&self, project_id: &ProjectId, dest_dir: &Path) -> Result<JobLog> {
        let hits = self
            .client
            .search(&self.index, project_id, true)
            .await?;
        let resources = hits.into_iter().filter_map(|(id, mut source)| {
            let resource_type = source.get("resource_type")?.as_str()?.to_string();
            let resource = source.get_mut("resource")?.take();
            Some(StoredResource {
                id,
                resource_type,
                resource,
            })
        });
        write_resources(dest_dir, resources)
    }

    async fn delete(&self, project_id: &ProjectId) -> Result<u64> {
        self.client
            .delete_by_query(&self.index, project_query(project_id))
            .await
    }

    async fn delete_not_in_manifest(&self, project_id: &ProjectId, manifest: &Manifest) -> Result<u64> {
        let existing = self
            .client
            .search_ids(&self.index, project_id)
            .await?;
        let doomed = manifest.missing_from(&existing);
        if doomed.is_empty() {
            return Ok(0);
        }
        self.client
            .delete_by_query(&self.index, project_ids_query(project_id, &doomed))
            .await
    }

    async fn refresh(&self) -> Result<()> {
        self.client.refresh(std::slice::from_ref(&self.index)).await
    }
}
