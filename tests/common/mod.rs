//! Fixtures shared by the job integration tests

#![allow(dead_code)]

use fhir_etl::adapters::memory::MemoryStores;
use fhir_etl::config::{secret_string, SecretString};
use fhir_etl::core::job::{JobOrchestrator, JobSettings};
use fhir_etl::domain::{ActorProfile, AuthzGrant, ProjectId, SchemaRef};
use std::io::Write;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const PROJECT: &str = "aced-Alzheimers";

pub fn project() -> ProjectId {
    ProjectId::new(PROJECT).unwrap()
}

pub fn token() -> SecretString {
    secret_string("test-token".to_string())
}

/// Actor with the two resources and a grant of `method` on the project
pub fn profile_with(method: &str) -> ActorProfile {
    ActorProfile::new("someone@example.org")
        .with_resource("/programs/aced")
        .with_resource("/programs/aced/projects")
        .with_grant(
            "/programs/aced/projects/Alzheimers",
            AuthzGrant::new(method, "*"),
        )
}

/// Actor allowed to create and read
pub fn admin() -> ActorProfile {
    profile_with("*")
}

/// Zip archive holding `members` (name, contents)
pub fn zip_bytes(members: &[(&str, String)]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, contents) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Ndjson text from JSON lines
pub fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Memory stores and an orchestrator over them, working under a temp dir
pub struct Harness {
    pub stores: MemoryStores,
    pub orchestrator: JobOrchestrator,
    pub studies_root: TempDir,
}

impl Harness {
    pub fn new(profile: ActorProfile) -> Self {
        let stores = MemoryStores::new(profile);
        let studies_root = TempDir::new().unwrap();
        let settings = JobSettings {
            studies_root: studies_root.path().to_path_buf(),
            file_extension: "ndjson".to_string(),
            schema: SchemaRef::new("https://example.org/dictionary.json").unwrap(),
            schema_is_default: false,
        };
        let orchestrator = JobOrchestrator::new(stores.collaborators(), settings);
        Self {
            stores,
            orchestrator,
            studies_root,
        }
    }

    /// Whether anything is left under the studies root
    pub fn studies_root_is_empty(&self) -> bool {
        std::fs::read_dir(self.studies_root.path())
            .unwrap()
            .next()
            .is_none()
    }
}
