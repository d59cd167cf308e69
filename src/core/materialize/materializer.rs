//! Download and expansion of commit objects

use super::working_area::WorkingArea;
use crate::adapters::archive::Archiver;
use crate::adapters::object_store::ObjectStore;
use crate::domain::{Commit, EtlError, JobLog, ObjectId, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Files produced by materializing one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedPaths {
    /// Staged archive
    pub archive: PathBuf,
    /// Expanded files, directly under the target directory
    pub files: Vec<PathBuf>,
}

/// Fetches objects from the bucket into a working area
pub struct Materializer {
    object_store: Arc<dyn ObjectStore + Send + Sync>,
    archiver: Arc<dyn Archiver + Send + Sync>,
}

impl Materializer {
    /// Creates a materializer
    pub fn new(
        object_store: Arc<dyn ObjectStore + Send + Sync>,
        archiver: Arc<dyn Archiver + Send + Sync>,
    ) -> Self {
        Self {
            object_store,
            archiver,
        }
    }

    /// Downloads `object_id` into the staging directory as `file_name`
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Download`] if the object cannot be fetched.
    pub async fn fetch(
        &self,
        object_id: &ObjectId,
        area: &WorkingArea,
        file_name: &str,
        log: &mut JobLog,
    ) -> Result<PathBuf> {
        let destination = area.staging_path(file_name);
        match self.object_store.download(object_id, &destination).await {
            Ok(path) => {
                log.info(format!("DOWNLOADED {object_id}"));
                Ok(path)
            }
            Err(e) => {
                log.warn(format!(
                    "ERROR DOWNLOADING {object_id} TO PATH: {}",
                    destination.display()
                ));
                Err(match e {
                    EtlError::Download(_) => e,
                    other => EtlError::Download(other.to_string()),
                })
            }
        }
    }

    /// Downloads the commit archive and expands it into `target_dir`
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Download`] or [`EtlError::Expansion`]; the caller moves
    /// on to the next commit.
    pub async fn fetch_and_expand(
        &self,
        commit: &Commit,
        area: &WorkingArea,
        target_dir: &Path,
        log: &mut JobLog,
    ) -> Result<ExpandedPaths> {
        let archive = self
            .fetch(&commit.object_id, area, &commit.meta_path, log)
            .await?;

        let archiver = Arc::clone(&self.archiver);
        let (source, target) = (archive.clone(), target_dir.to_path_buf());
        let expanded = tokio::task::spawn_blocking(move || archiver.expand(&source, &target))
            .await
            .map_err(|e| EtlError::Expansion(format!("expansion task failed: {e}")))
            .and_then(|result| result);

        match expanded {
            Ok(files) => {
                log.info(format!("UNZIPPED {}", target_dir.display()));
                Ok(ExpandedPaths { archive, files })
            }
            Err(e) => {
                log.warn(format!("ERROR UNZIPPING {}", commit.object_id));
                Err(match e {
                    EtlError::Expansion(_) => e,
                    other => EtlError::Expansion(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::archive::ZipArchiver;
    use crate::adapters::object_store::MemoryObjectStore;
    use crate::domain::{CommitId, ProjectId};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
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

    fn commit(object_id: &str) -> Commit {
        Commit {
            object_id: ObjectId::new(object_id).unwrap(),
            commit_id: CommitId::new("c1").unwrap(),
            meta_path: "commit.zip".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_and_expand() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store
            .insert("obj-1", zip_bytes(&[("META/Patient.ndjson", "{}")]))
            .await;
        let materializer = Materializer::new(store, Arc::new(ZipArchiver::new()));
        let area = WorkingArea::new(dir.path(), &ProjectId::new("aced-Diabetes").unwrap());
        let commit = commit("obj-1");
        let target = area.prepare_commit(&commit.commit_id).unwrap();

        let mut log = JobLog::new();
        let expanded = materializer
            .fetch_and_expand(&commit, &area, &target, &mut log)
            .await
            .unwrap();

        assert_eq!(expanded.files, vec![target.join("Patient.ndjson")]);
        assert!(log.contains("DOWNLOADED obj-1"));
        assert!(log.contains("UNZIPPED"));
    }

    #[tokio::test]
    async fn test_missing_object_is_download_error() {
        let dir = TempDir::new().unwrap();
        let materializer = Materializer::new(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(ZipArchiver::new()),
        );
        let area = WorkingArea::new(dir.path(), &ProjectId::new("aced-Diabetes").unwrap());
        let commit = commit("missing");
        let target = area.prepare_commit(&commit.commit_id).unwrap();

        let mut log = JobLog::new();
        let err = materializer
            .fetch_and_expand(&commit, &area, &target, &mut log)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::Download(_)));
        assert!(log.contains("ERROR DOWNLOADING missing TO PATH:"));
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_expansion_error() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("obj-1", b"not a zip".to_vec()).await;
        let materializer = Materializer::new(store, Arc::new(ZipArchiver::new()));
        let area = WorkingArea::new(dir.path(), &ProjectId::new("aced-Diabetes").unwrap());
        let commit = commit("obj-1");
        let target = area.prepare_commit(&commit.commit_id).unwrap();

        let mut log = JobLog::new();
        let err = materializer
            .fetch_and_expand(&commit, &area, &target, &mut log)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::Expansion(_)));
        assert!(log.contains("ERROR UNZIPPING obj-1"));
    }
}
