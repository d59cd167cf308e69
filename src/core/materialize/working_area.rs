//! Per-project working directories
//!
//! Layout under `studies_root`:
//!
//! ```text
//! {program}-{project}/
//!   downloads/             staged objects
//!   commits/{commit_id}/   expanded commit, plus extractions/
//!   export/                documents read back for a snapshot
//! ```
//!
//! The whole project directory is removed after every commit, reset and export.

use crate::domain::{CommitId, ProjectId, Result};
use std::path::{Component, Path, PathBuf};

/// Working directories of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingArea {
    root: PathBuf,
}

impl WorkingArea {
    /// Working area of `project_id` under `studies_root`
    pub fn new(studies_root: &Path, project_id: &ProjectId) -> Self {
        Self {
            root: studies_root.join(project_id.to_string()),
        }
    }

    /// Project directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one commit
    pub fn commit_dir(&self, commit_id: &CommitId) -> PathBuf {
        self.root.join("commits").join(commit_id.as_str())
    }

    /// Directory objects are downloaded into
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    /// Directory documents are exported into
    pub fn export_dir(&self) -> PathBuf {
        self.root.join("export")
    }

    /// Staging path for an object saved as `relative`
    ///
    /// Absolute paths and parent components are reduced to the file name so a
    /// staged object never lands outside the staging directory.
    pub fn staging_path(&self, relative: &str) -> PathBuf {
        let candidate = Path::new(relative);
        let safe = candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if safe && !relative.is_empty() {
            self.staging_dir().join(candidate)
        } else {
            let name = candidate
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("object"));
            self.staging_dir().join(name)
        }
    }

    /// Creates an empty directory for `commit_id`, removing leftovers
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be reset.
    pub fn prepare_commit(&self, commit_id: &CommitId) -> Result<PathBuf> {
        let dir = self.commit_dir(commit_id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Removes the project directory and everything below it
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists and cannot be removed.
    pub fn cleanup(&self) -> Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Entries directly under `dir`, sorted, as strings
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn list_top_level(dir: &Path) -> Result<Vec<String>> {
        let mut entries: Vec<String> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().display().to_string())
            .collect();
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn area(root: &Path) -> WorkingArea {
        WorkingArea::new(root, &ProjectId::new("aced-Alzheimers").unwrap())
    }

    #[test]
    fn test_layout() {
        let area = area(Path::new("/root/studies"));
        let commit = CommitId::new("c1").unwrap();
        assert_eq!(area.root(), Path::new("/root/studies/aced-Alzheimers"));
        assert_eq!(
            area.commit_dir(&commit),
            PathBuf::from("/root/studies/aced-Alzheimers/commits/c1")
        );
        assert_eq!(
            area.staging_dir(),
            PathBuf::from("/root/studies/aced-Alzheimers/downloads")
        );
    }

    #[test]
    fn test_staging_path_stays_inside_staging_dir() {
        let area = area(Path::new("/w"));
        assert_eq!(
            area.staging_path(".g3t/state/c1/meta-index.ndjson"),
            PathBuf::from("/w/aced-Alzheimers/downloads/.g3t/state/c1/meta-index.ndjson")
        );
        assert_eq!(
            area.staging_path("../../etc/passwd"),
            PathBuf::from("/w/aced-Alzheimers/downloads/passwd")
        );
        assert_eq!(
            area.staging_path("/abs/commit.zip"),
            PathBuf::from("/w/aced-Alzheimers/downloads/commit.zip")
        );
    }

    #[test]
    fn test_prepare_commit_is_fresh_and_cleanup_removes_project() {
        let dir = TempDir::new().unwrap();
        let area = area(dir.path());
        let commit = CommitId::new("c1").unwrap();

        let commit_dir = area.prepare_commit(&commit).unwrap();
        std::fs::write(commit_dir.join("leftover.ndjson"), "{}").unwrap();
        let commit_dir = area.prepare_commit(&commit).unwrap();
        assert!(WorkingArea::list_top_level(&commit_dir).unwrap().is_empty());

        area.cleanup().unwrap();
        assert!(!area.root().exists());
        area.cleanup().unwrap();
    }
}
