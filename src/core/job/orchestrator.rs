//! One job run: parse, identify, authorize, dispatch
//!
//! Every branch appends to the [`JobResult`] log and never discards it. Only a
//! malformed request or a failed identity lookup ends the job early; every other
//! failure is recorded by the stage that hit it and the job carries on.

use crate::adapters::Collaborators;
use crate::config::{EtlConfig, SecretString};
use crate::core::authz::{authorize, OperationKind};
use crate::core::export::SnapshotExporter;
use crate::core::load::{LoadOptions, Loader};
use crate::core::materialize::{Materializer, WorkingArea};
use crate::core::normalize::Normalizer;
use crate::core::reconcile::{Reconciler, Scope};
use crate::domain::{
    ActorProfile, Commit, CommitId, EtlError, JobAction, JobLog, JobRequest, JobResult, Manifest,
    ObjectId, ProjectId, Result, SchemaRef,
};
use std::path::PathBuf;

/// Name the reset manifest is stored under in the commit directory
pub const MANIFEST_FILE_NAME: &str = "meta-index.ndjson";

/// Local settings of a job run
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Root of the per-project studies directories
    pub studies_root: PathBuf,
    /// Extension of dataset files inside commit archives
    pub file_extension: String,
    /// Dictionary the stores validate against
    pub schema: SchemaRef,
    /// Whether `schema` is the built-in default
    pub schema_is_default: bool,
}

impl JobSettings {
    /// Settings from configuration
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Configuration`] if the dictionary URL is invalid.
    pub fn from_config(config: &EtlConfig) -> Result<Self> {
        let (schema, schema_is_default) = config
            .dictionary
            .resolve()
            .map_err(EtlError::Configuration)?;
        Ok(Self {
            studies_root: config.work.studies_root.clone(),
            file_extension: config.work.file_extension.clone(),
            schema,
            schema_is_default,
        })
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The request was dispatched; individual stages may still have failed
    Completed,
    /// The request was malformed or named an unknown method
    Rejected,
    /// The access token could not be resolved to a profile
    IdentityFailed,
}

/// Result of a run plus how it ended
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub result: JobResult,
    pub status: JobStatus,
}

/// Runs put, get and delete jobs over a set of collaborators
pub struct JobOrchestrator {
    collaborators: Collaborators,
    settings: JobSettings,
    materializer: Materializer,
    normalizer: Normalizer,
    loader: Loader,
    exporter: SnapshotExporter,
    reconciler: Reconciler,
}

impl JobOrchestrator {
    /// Creates an orchestrator
    pub fn new(collaborators: Collaborators, settings: JobSettings) -> Self {
        Self {
            materializer: Materializer::new(
                collaborators.object_store.clone(),
                collaborators.archiver.clone(),
            ),
            normalizer: Normalizer::new(settings.file_extension.clone()),
            loader: Loader::new(&collaborators),
            exporter: SnapshotExporter::new(&collaborators, settings.studies_root.clone()),
            reconciler: Reconciler::new(&collaborators),
            collaborators,
            settings,
        }
    }

    /// Runs the job described by `input` on behalf of the owner of `token`
    ///
    /// The request is validated before any collaborator is called.
    pub async fn run(&self, input: &str, token: &SecretString) -> JobOutcome {
        let request = match JobRequest::parse(input) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "Rejected job request");
                return JobOutcome {
                    result: JobResult::rejected(None, e),
                    status: JobStatus::Rejected,
                };
            }
        };

        let profile = match self.collaborators.identity.actor_profile(token).await {
            Ok(profile) => profile,
            Err(e) => {
                let mut result = JobResult::new(None);
                result.logs.exception("fetching user profile", e);
                return JobOutcome {
                    result,
                    status: JobStatus::IdentityFailed,
                };
            }
        };

        JobOutcome {
            result: self.execute(&request, &profile).await,
            status: JobStatus::Completed,
        }
    }

    /// Runs an already validated request for `profile`
    pub async fn execute(&self, request: &JobRequest, profile: &ActorProfile) -> JobResult {
        let mut result = JobResult::new(profile.email.clone());
        if self.settings.schema_is_default {
            result.logs.info(format!(
                "DICTIONARY_URL not found in environment using {}",
                self.settings.schema
            ));
        }

        let project_id = &request.project_id;
        tracing::info!(project_id = %project_id, method = %request.method(), "Starting job");

        match &request.action {
            JobAction::Put { commits } => self.put(project_id, commits, profile, &mut result).await,
            JobAction::Get => {
                let export = self.exporter.export(project_id, profile).await;
                result.merge_log(export.log);
                result.set_object_id(export.object_id);
            }
            JobAction::Reset {
                commit_id,
                object_id,
            } => {
                self.reset(project_id, commit_id, object_id, profile, &mut result)
                    .await
            }
            JobAction::Empty => self.empty(project_id, profile, &mut result).await,
        }

        tracing::info!(project_id = %project_id, lines = result.logs.len(), "Finished job");
        result
    }

    async fn put(
        &self,
        project_id: &ProjectId,
        commits: &[Commit],
        profile: &ActorProfile,
        result: &mut JobResult,
    ) {
        let decision = authorize(project_id, OperationKind::Create, profile);
        result.merge_log(decision.trace);
        result.logs.info(format!("CAN CREATE: {}", decision.granted));

        if decision.granted {
            for commit in commits {
                self.import_commit(project_id, commit, result).await;
            }
        } else {
            result
                .logs
                .warn(format!("No create permissions on {project_id}"));
        }

        let export = self.exporter.export(project_id, profile).await;
        result.merge_log(export.log);
        result.set_snapshot(export.object_id);
    }

    async fn import_commit(&self, project_id: &ProjectId, commit: &Commit, result: &mut JobResult) {
        let area = WorkingArea::new(&self.settings.studies_root, project_id);
        let mut log = JobLog::new();
        let mut files = Vec::new();

        if let Err(e) = self
            .load_commit(project_id, commit, &area, &mut log, &mut files)
            .await
        {
            log.exception(format!("loading commit {}", commit.commit_id), e);
        }
        cleanup(&area, &mut log);

        for file in files {
            result.add_file(file);
        }
        result.merge_log(log);
    }

    async fn load_commit(
        &self,
        project_id: &ProjectId,
        commit: &Commit,
        area: &WorkingArea,
        log: &mut JobLog,
        files: &mut Vec<String>,
    ) -> Result<()> {
        let commit_dir = area.prepare_commit(&commit.commit_id)?;
        self.materializer
            .fetch_and_expand(commit, area, &commit_dir, log)
            .await?;
        files.extend(WorkingArea::list_top_level(&commit_dir)?);

        log.info(format!("Simplifying study: {}", commit_dir.display()));
        let normalizer = self.normalizer.clone();
        let schema = self.settings.schema.clone();
        let canonical = tokio::task::spawn_blocking(move || normalizer.normalize(&commit_dir, &schema))
            .await
            .map_err(|e| EtlError::Normalization(format!("normalization task failed: {e}")))??;
        if canonical.skipped() > 0 {
            log.warn(format!(
                "skipped {} lines without a resourceType and id",
                canonical.skipped()
            ));
        }

        let report = self
            .loader
            .load(&canonical, project_id, &self.settings.schema, LoadOptions::default())
            .await;
        log.append(report.log);
        Ok(())
    }

    async fn reset(
        &self,
        project_id: &ProjectId,
        commit_id: &CommitId,
        object_id: &ObjectId,
        profile: &ActorProfile,
        result: &mut JobResult,
    ) {
        let decision = authorize(project_id, OperationKind::Create, profile);
        result.merge_log(decision.trace);
        if !decision.granted {
            result
                .logs
                .warn(format!("No create permissions on {project_id}"));
            return;
        }

        result.logs.info(format!("reseting to {commit_id}"));
        let area = WorkingArea::new(&self.settings.studies_root, project_id);
        let mut log = JobLog::new();

        match self
            .fetch_manifest(project_id, commit_id, object_id, &area, &mut log)
            .await
        {
            Ok((manifest, files)) => {
                for file in files {
                    result.add_file(file);
                }
                let report = self
                    .reconciler
                    .reconcile(Some(&manifest), project_id, Scope::All, &self.settings.schema)
                    .await;
                log.append(report.log);
            }
            Err(e) => log.exception(format!("resetting project {project_id}"), e),
        }
        cleanup(&area, &mut log);
        result.merge_log(log);
    }

    async fn fetch_manifest(
        &self,
        project_id: &ProjectId,
        commit_id: &CommitId,
        object_id: &ObjectId,
        area: &WorkingArea,
        log: &mut JobLog,
    ) -> Result<(Manifest, Vec<String>)> {
        let commit_dir = area.prepare_commit(commit_id)?;
        let staged_name =
            format!(".g3t/state/{project_id}/commits/{commit_id}/{MANIFEST_FILE_NAME}");
        let staged = self
            .materializer
            .fetch(object_id, area, &staged_name, log)
            .await?;

        let manifest_path = commit_dir.join(MANIFEST_FILE_NAME);
        std::fs::rename(&staged, &manifest_path)?;
        let files = WorkingArea::list_top_level(&commit_dir)?;

        let manifest = Manifest::from_file(&manifest_path)?;
        tracing::info!(project_id = %project_id, commit_id = %commit_id, records = manifest.len(), "Read manifest");
        Ok((manifest, files))
    }

    async fn empty(&self, project_id: &ProjectId, profile: &ActorProfile, result: &mut JobResult) {
        let decision = authorize(project_id, OperationKind::Create, profile);
        result.merge_log(decision.trace);
        if !decision.granted {
            result
                .logs
                .warn(format!("No create permissions on {project_id}"));
            return;
        }

        let report = self
            .reconciler
            .reconcile(None, project_id, Scope::All, &self.settings.schema)
            .await;
        result.merge_log(report.log);
    }
}

fn cleanup(area: &WorkingArea, log: &mut JobLog) {
    if let Err(e) = area.cleanup() {
        log.warn(format!(
            "failed to remove {}: {e}",
            area.root().display()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStores;
    use crate::config::secret_string;
    use crate::domain::AuthzGrant;
    use tempfile::TempDir;

    fn settings(root: &TempDir) -> JobSettings {
        JobSettings {
            studies_root: root.path().to_path_buf(),
            file_extension: "ndjson".to_string(),
            schema: SchemaRef::new("https://example.org/dictionary.json").unwrap(),
            schema_is_default: false,
        }
    }

    fn writer() -> ActorProfile {
        ActorProfile::new("writer@example.org")
            .with_resource("/programs/aced")
            .with_resource("/programs/aced/projects")
            .with_grant("/programs/aced/projects/Alzheimers", AuthzGrant::new("*", "*"))
    }

    #[tokio::test]
    async fn test_malformed_request_makes_no_call() {
        let root = TempDir::new().unwrap();
        let stores = MemoryStores::new(writer());
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings(&root));

        let outcome = orchestrator
            .run(r#"{"method": "get", "project_id": "nodash"}"#, &secret_string("token".to_string()))
            .await;

        assert_eq!(outcome.status, JobStatus::Rejected);
        assert!(outcome.result.logs.contains("An Exception Occurred: Malformed request"));
        assert!(stores.recorder.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let root = TempDir::new().unwrap();
        let stores = MemoryStores::new(writer());
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings(&root));

        let outcome = orchestrator
            .run(r#"{"method": "patch", "project_id": "aced-Alzheimers"}"#, &secret_string("token".to_string()))
            .await;

        assert_eq!(outcome.status, JobStatus::Rejected);
        assert!(outcome.result.logs.contains("unknown method patch"));
    }

    #[tokio::test]
    async fn test_identity_failure() {
        let root = TempDir::new().unwrap();
        let stores = MemoryStores::rejecting_identity();
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings(&root));

        let outcome = orchestrator
            .run(r#"{"method": "get", "project_id": "aced-Alzheimers"}"#, &secret_string("token".to_string()))
            .await;

        assert_eq!(outcome.status, JobStatus::IdentityFailed);
        assert_eq!(outcome.result.user, None);
        assert!(stores.store_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_default_dictionary_is_logged() {
        let root = TempDir::new().unwrap();
        let stores = MemoryStores::new(writer());
        let mut settings = settings(&root);
        settings.schema_is_default = true;
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings);

        let outcome = orchestrator
            .run(r#"{"method": "delete", "project_id": "aced-Alzheimers"}"#, &secret_string("token".to_string()))
            .await;

        assert_eq!(outcome.status, JobStatus::Completed);
        assert_eq!(
            outcome.result.logs.entries()[0],
            "DICTIONARY_URL not found in environment using https://example.org/dictionary.json"
        );
        assert_eq!(outcome.result.user.as_deref(), Some("writer@example.org"));
    }

    #[tokio::test]
    async fn test_denied_empty_leaves_stores_untouched() {
        let root = TempDir::new().unwrap();
        let stores = MemoryStores::new(ActorProfile::new("reader@example.org"));
        let project = ProjectId::new("aced-Alzheimers").unwrap();
        stores.graph.seed(&project, ["p1"]).await;
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings(&root));

        let outcome = orchestrator
            .run(r#"{"method": "delete", "project_id": "aced-Alzheimers"}"#, &secret_string("token".to_string()))
            .await;

        assert!(outcome.result.logs.contains("No create permissions on aced-Alzheimers"));
        assert!(stores.store_calls().await.is_empty());
        assert_eq!(stores.graph.ids(&project).await.len(), 1);
    }
}
