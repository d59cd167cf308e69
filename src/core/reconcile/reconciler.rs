//! Emptying and resetting the derived stores of a project
//!
//! Without a manifest every record of the project is removed. With one, each store
//! removes exactly the records whose id the manifest does not name; the graph is
//! reconciled in place the same way, so running a reset twice removes nothing the
//! second time.

use crate::adapters::discovery::DiscoveryStore;
use crate::adapters::documents::DocumentStore;
use crate::adapters::graph::GraphStore;
use crate::adapters::search::SearchIndex;
use crate::adapters::Collaborators;
use crate::domain::{JobLog, Manifest, ProjectId, ResourceType, Result, SchemaRef, StoreKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Stores a reconciliation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Graph,
    Index,
    Documents,
    /// Every store, plus the discovery summary when emptying
    All,
}

impl Scope {
    fn includes(self, other: Scope) -> bool {
        self == Scope::All || self == other
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub log: JobLog,
    /// Records removed, per store
    pub removed: BTreeMap<StoreKind, u64>,
    pub succeeded: bool,
}

impl ReconcileReport {
    /// Records removed across every store
    pub fn total_removed(&self) -> u64 {
        self.removed.values().sum()
    }
}

/// Removes project records from the derived stores
pub struct Reconciler {
    graph: Arc<dyn GraphStore + Send + Sync>,
    search: Arc<dyn SearchIndex + Send + Sync>,
    documents: Arc<dyn DocumentStore + Send + Sync>,
    discovery: Arc<dyn DiscoveryStore + Send + Sync>,
}

impl Reconciler {
    /// Creates a reconciler over the stores of `collaborators`
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            graph: Arc::clone(&collaborators.graph),
            search: Arc::clone(&collaborators.search),
            documents: Arc::clone(&collaborators.documents),
            discovery: Arc::clone(&collaborators.discovery),
        }
    }

    /// Empties `project_id` (no manifest) or resets it to `manifest`
    ///
    /// The first failing store stops the remaining scopes; the failure is logged
    /// with its trace.
    pub async fn reconcile(
        &self,
        manifest: Option<&Manifest>,
        project_id: &ProjectId,
        scope: Scope,
        schema: &SchemaRef,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let outcome = match manifest {
            None => self.empty(project_id, scope, schema, &mut report).await,
            Some(manifest) => self.reset(manifest, project_id, scope, schema, &mut report).await,
        };
        match outcome {
            Ok(()) => report.succeeded = true,
            Err(e) => {
                let action = if manifest.is_some() { "resetting" } else { "emptying" };
                report.log.exception(format!("{action} project {project_id}"), e);
            }
        }
        report
    }

    async fn empty(
        &self,
        project_id: &ProjectId,
        scope: Scope,
        schema: &SchemaRef,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        if scope.includes(Scope::Graph) {
            let removed = self.graph.empty(project_id, schema, None).await?;
            report.removed.insert(StoreKind::Graph, removed as u64);
            report.log.info(format!("EMPTIED graph for {project_id}"));
        }

        if scope.includes(Scope::Index) {
            let mut removed = 0;
            for index in ResourceType::index_names() {
                removed += self.search.delete(project_id, index).await?;
            }
            report.removed.insert(StoreKind::Search, removed);
            report.log.info(format!("EMPTIED flat for {project_id}"));
        }

        if scope.includes(Scope::Documents) {
            let removed = self.documents.delete(project_id).await?;
            report.removed.insert(StoreKind::Documents, removed);
            report.log.info(format!("EMPTIED FHIR STORE for {project_id}"));
        }

        if scope == Scope::All {
            let has_summary = self
                .discovery
                .get(project_id)
                .await?
                .is_some_and(|record| record.as_object().map_or(true, |o| !o.is_empty()));
            if has_summary {
                self.discovery.delete(project_id).await?;
                report.removed.insert(StoreKind::Discovery, 1);
                report
                    .log
                    .info(format!("EMPTIED discovery summary for {project_id}"));
            }
        }
        Ok(())
    }

    async fn reset(
        &self,
        manifest: &Manifest,
        project_id: &ProjectId,
        scope: Scope,
        schema: &SchemaRef,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        if scope.includes(Scope::Graph) {
            let removed = self.graph.empty(project_id, schema, Some(manifest)).await? as u64;
            report.removed.insert(StoreKind::Graph, removed);
            report
                .log
                .info(format!("RESET graph for {project_id}, removed {removed} records"));
        }

        if scope.includes(Scope::Index) {
            let removed = self
                .search
                .delete_not_in_manifest(project_id, manifest, None)
                .await?;
            report.removed.insert(StoreKind::Search, removed);
            report
                .log
                .info(format!("RESET flat for {project_id}, removed {removed} documents"));
        }

        if scope.includes(Scope::Documents) {
            let removed = self
                .documents
                .delete_not_in_manifest(project_id, manifest)
                .await?;
            report.removed.insert(StoreKind::Documents, removed);
            report.log.info(format!(
                "RESET FHIR STORE for {project_id}, removed {removed} resources"
            ));
        }
        Ok(())
    }
}
