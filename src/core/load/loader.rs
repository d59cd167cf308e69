//! Fan-out of one canonical set into the graph, flat, discovery and document stores
//!
//! Stages run in a fixed order: graph, the three flat indices, the discovery
//! summary (only when the set has a research study) and the document store. The
//! first failing stage stops the load; the failure is logged with its trace and
//! never propagated.

use crate::adapters::discovery::{DiscoveryStore, StudySummary};
use crate::adapters::documents::DocumentStore;
use crate::adapters::graph::GraphStore;
use crate::adapters::search::SearchIndex;
use crate::adapters::Collaborators;
use crate::core::normalize::{denormalize_file, CanonicalSet};
use crate::domain::canonical::read_canonical_file;
use crate::domain::{EtlError, JobLog, ProjectId, ResourceType, Result, SchemaRef};
use serde_json::Value;
use std::sync::Arc;

/// Stages to skip; the job never skips any
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub skip_graph: bool,
    pub skip_flat: bool,
    pub skip_documents: bool,
}

/// Outcome of one load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Stage log, including the trace of a failure
    pub log: JobLog,
    /// Whether every stage completed
    pub succeeded: bool,
}

/// Loads canonical sets into every derived store
pub struct Loader {
    graph: Arc<dyn GraphStore + Send + Sync>,
    search: Arc<dyn SearchIndex + Send + Sync>,
    documents: Arc<dyn DocumentStore + Send + Sync>,
    discovery: Arc<dyn DiscoveryStore + Send + Sync>,
}

impl Loader {
    /// Creates a loader over the stores of `collaborators`
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            graph: Arc::clone(&collaborators.graph),
            search: Arc::clone(&collaborators.search),
            documents: Arc::clone(&collaborators.documents),
            discovery: Arc::clone(&collaborators.discovery),
        }
    }

    /// Loads `canonical` for `project_id`
    pub async fn load(
        &self,
        canonical: &CanonicalSet,
        project_id: &ProjectId,
        schema: &SchemaRef,
        options: LoadOptions,
    ) -> LoadReport {
        let mut log = JobLog::new();
        match self
            .run_stages(canonical, project_id, schema, options, &mut log)
            .await
        {
            Ok(()) => {
                log.info(format!("LOADED {project_id}"));
                LoadReport {
                    log,
                    succeeded: true,
                }
            }
            Err(e) => {
                log.exception(format!("loading {project_id}"), e);
                LoadReport {
                    log,
                    succeeded: false,
                }
            }
        }
    }

    async fn run_stages(
        &self,
        canonical: &CanonicalSet,
        project_id: &ProjectId,
        schema: &SchemaRef,
        options: LoadOptions,
        log: &mut JobLog,
    ) -> Result<()> {
        if !options.skip_graph {
            let written = self.graph.upload(project_id, canonical.dir(), schema).await?;
            log.info(format!("uploaded {written} records to the graph"));
        }

        if !options.skip_flat {
            self.load_flat(canonical, project_id, schema, log).await?;
        }

        if let Some(study_path) = canonical.path_for(ResourceType::ResearchStudy) {
            log.info("Writing to metadata-service");
            self.search.refresh().await?;
            let patient_count = self.search.count(project_id, "patient").await?;

            let study = read_canonical_file(&study_path)?
                .into_iter()
                .next()
                .ok_or_else(|| EtlError::Normalization("research study file is empty".to_string()))?;
            let summary = StudySummary {
                patient_count,
                description: study
                    .object
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                identifiers: study
                    .object
                    .get("identifier_coding")
                    .and_then(Value::as_array)
                    .map(|codes| {
                        codes
                            .iter()
                            .filter_map(|c| c.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            };
            self.discovery.publish(project_id, &summary, true).await?;
            log.info(format!(
                "published discovery summary for {project_id} with {patient_count} patients"
            ));
        }

        if !options.skip_documents {
            let document_log = self.documents.put(project_id, canonical.dir()).await?;
            log.append(document_log);
        }

        Ok(())
    }

    async fn load_flat(
        &self,
        canonical: &CanonicalSet,
        project_id: &ProjectId,
        schema: &SchemaRef,
        log: &mut JobLog,
    ) -> Result<()> {
        for resource_type in ResourceType::INDEXED {
            let Some(index) = resource_type.index_name() else {
                continue;
            };
            match canonical.path_for(resource_type) {
                None => {
                    self.search.load(project_id, index, None, schema).await?;
                    log.info(format!("loaded index {index} from empty payload"));
                }
                Some(path) => {
                    let path = if resource_type == ResourceType::Patient {
                        let denormalized = canonical
                            .dir()
                            .parent()
                            .unwrap_or_else(|| canonical.dir())
                            .join("denormalized")
                            .join(resource_type.file_name());
                        denormalize_file(&path, &denormalized)?;
                        denormalized
                    } else {
                        path
                    };
                    let written = self
                        .search
                        .load(project_id, index, Some(&path), schema)
                        .await?;
                    log.info(format!(
                        "loaded index {index} from {} ({written} documents)",
                        path.display()
                    ));
                }
            }
        }
        Ok(())
    }
}
