//! Flat indices in Elasticsearch
//!
//! Logical index `patient` maps to the physical index `{prefix}_patient_0`. Every
//! document carries `project_id` and `auth_resource_path` so project scoping and
//! access filtering work on the same index. Document `_id`s are prefixed with the
//! project so equal record ids in two projects never overwrite each other.

use super::SearchIndex;
use crate::adapters::elastic::{document_id, project_ids_query, project_query, ElasticClient};
use crate::config::ElasticConfig;
use crate::domain::canonical::read_ndjson;
use crate::domain::{EtlError, Manifest, ProjectId, ResourceType, Result, SchemaRef};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Search index backed by Elasticsearch
pub struct ElasticSearchIndex {
    client: ElasticClient,
    config: ElasticConfig,
}

impl ElasticSearchIndex {
    /// Creates an index client
    pub fn new(client: ElasticClient, config: ElasticConfig) -> Self {
        Self { client, config }
    }

    fn physical(&self, index: &str) -> String {
        self.config.flat_index(index)
    }
}

fn to_document(project_id: &ProjectId, mut document: Value) -> Result<(String, Value)> {
    let id = document
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EtlError::Serialization("flat document without an id".to_string()))?;
    if let Some(fields) = document.as_object_mut() {
        fields.insert("project_id".to_string(), Value::from(project_id.to_string()));
        fields.insert(
            "auth_resource_path".to_string(),
            Value::from(project_id.resource_path()),
        );
    }
    Ok((document_id(project_id, &id), document))
}

#[async_trait]
impl SearchIndex for ElasticSearchIndex {
    async fn load(
        &self,
        project_id: &ProjectId,
        index: &str,
        path: Option<&Path>,
        schema: &SchemaRef,
    ) -> Result<usize> {
        let physical = self.physical(index);
        self.client.ensure_index(&physical).await?;

        let Some(path) = path else {
            return Ok(0);
        };

        let documents = read_ndjson(path)?
            .into_iter()
            .map(|document| to_document(project_id, document))
            .collect::<Result<Vec<_>>>()?;
        let written = self.client.bulk_index(&physical, &documents).await?;

        tracing::info!(
            project_id = %project_id,
            index = %physical,
            schema = %schema,
            documents = written,
            "Loaded flat index"
        );
        Ok(written)
    }

    async fn delete(&self, project_id: &ProjectId, index: &str) -> Result<u64> {
        self.client
            .delete_by_query(&self.physical(index), project_query(project_id))
            .await
    }

    async fn delete_not_in_manifest(
        &self,
        project_id: &ProjectId,
        manifest: &Manifest,
        index: Option<&str>,
    ) -> Result<u64> {
        let indices: Vec<&str> = match index {
            Some(index) => vec![index],
            None => ResourceType::index_names().collect(),
        };

        let mut removed = 0;
        for index in indices {
            let physical = self.physical(index);
            let existing = self
                .client
                .search_ids(&physical, project_id)
                .await?;
            let doomed = manifest.missing_from(&existing);
            if doomed.is_empty() {
                continue;
            }
            removed += self
                .client
                .delete_by_query(&physical, project_ids_query(project_id, &doomed))
                .await?;
        }
        Ok(removed)
    }

    async fn count(&self, project_id: &ProjectId, index: &str) -> Result<u64> {
        self.client
            .count(&self.physical(index), project_query(project_id))
            .await
    }

    async fn refresh(&self) -> Result<()> {
        let indices: Vec<String> = ResourceType::index_names()
            .map(|index| self.physical(index))
            .collect();
        self.client.refresh(&indices).await
    }
}
