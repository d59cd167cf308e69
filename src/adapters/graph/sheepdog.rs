//! Graph store backed by the commons submission API

use super::GraphStore;
use crate::adapters::http::{check_status, connection_error, read_json, HttpClient};
use crate::domain::canonical::read_canonical_dir;
use crate::domain::{Manifest, ProjectId, Result, SchemaRef, StoreError, StoreKind};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

const SUBMISSION_PATH: &str = "/api/v0/submission";
const CHUNK_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: GraphqlNodes,
}

#[derive(Debug, Deserialize)]
struct GraphqlNodes {
    #[serde(default)]
    node: Vec<NodeId>,
}

#[derive(Debug, Deserialize)]
struct NodeId {
    id: String,
}

/// Submits records with `PUT /api/v0/submission/{program}/{project}` and removes
/// them through the entities endpoint
pub struct SheepdogGraphStore {
    http: HttpClient,
}

impl SheepdogGraphStore {
    /// Creates a store over `http`
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn project_path(project_id: &ProjectId) -> String {
        format!(
            "{SUBMISSION_PATH}/{}/{}",
            project_id.program(),
            project_id.project()
        )
    }

    async fn submit(&self, project_id: &ProjectId, entities: &[Value]) -> Result<()> {
        let path = Self::project_path(project_id);
        let body: SubmissionResponse = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::PUT, &path)
                    .json(entities)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::Graph, e))?;
                let response = check_status(StoreKind::Graph, response).await?;
                read_json(StoreKind::Graph, response).await
            })
            .await?;

        if !body.success {
            return Err(StoreError::write(
                StoreKind::Graph,
                body.message
                    .unwrap_or_else(|| "submission was not accepted".to_string()),
            )
            .into());
        }
        Ok(())
    }

    async fn node_ids(&self, project_id: &ProjectId) -> Result<Vec<String>> {
        let query = json!({
            "query": format!("{{ node(project_id: \"{project_id}\", first: 0) {{ id }} }}"),
        });
        let path = format!("{SUBMISSION_PATH}/graphql");
        let body: GraphqlResponse = self
            .http
            .retry_request(|| async {
                let response = self
                    .http
                    .request(Method::POST, &path)
                    .json(&query)
                    .send()
                    .await
                    .map_err(|e| connection_error(StoreKind::Graph, e))?;
                let response = check_status(StoreKind::Graph, response).await?;
                read_json(StoreKind::Graph, response).await
            })
            .await?;
        Ok(body.data.node.into_iter().map(|n| n.id).collect())
    }

    async fn delete_ids(&self, project_id: &ProjectId, ids: &[String]) -> Result<()> {
        for chunk in ids.chunks(CHUNK_SIZE) {
            let path = format!(
                "{}/entities/{}",
                Self::project_path(project_id),
                chunk.join(",")
            );
            let response = self
                .http
                .request(Method::DELETE, &path)
                .send()
                .await
                .map_err(|e| connection_error(StoreKind::Graph, e))?;
            check_status(StoreKind::Graph, response).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for SheepdogGraphStore {
    async fn upload(
        &self,
        project_id: &ProjectId,
        canonical_dir: &Path,
        schema: &SchemaRef,
    ) -> Result<usize> {
        let records = read_canonical_dir(canonical_dir)?;
        let entities: Vec<Value> = records
            .iter()
            .map(|record| {
                json!({
                    "type": record.name,
                    "id": record.id,
                    "submitter_id": record.id,
                    "relations": record.relations,
                    "object": record.object,
                })
            })
            .collect();

        for chunk in entities.chunks(CHUNK_SIZE) {
            self.submit(project_id, chunk).await?;
        }

        tracing::info!(
            project_id = %project_id,
            schema = %schema,
            records = entities.len(),
            "Submitted records to graph"
        );
        Ok(entities.len())
    }

    async fn empty(
        &self,
        project_id: &ProjectId,
        schema: &SchemaRef,
        manifest: Option<&Manifest>,
    ) -> Result<usize> {
        let existing = self.node_ids(project_id).await?;
        let doomed = match manifest {
            Some(manifest) => manifest.missing_from(&existing),
            None => existing,
        };

        self.delete_ids(project_id, &doomed).await?;

        tracing::info!(
            project_id = %project_id,
            schema = %schema,
            removed = doomed.len(),
            reset = manifest.is_some(),
            "Removed graph records"
        );
        Ok(doomed.len())
    }
}
