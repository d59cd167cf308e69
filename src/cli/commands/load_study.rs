//! Load-study command implementation
//!
//! Loads an already unpacked study directory for one project, without a job
//! description or authorization. Used by operators to seed a commons.

use crate::adapters::create_collaborators;
use crate::config::load_config_or_default;
use crate::core::load::{LoadOptions, Loader};
use crate::core::normalize::Normalizer;
use crate::domain::ProjectId;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the load-study command
#[derive(Args, Debug)]
pub struct LoadStudyArgs {
    /// Target project, `program-project`
    pub project_id: String,

    /// Study directory (default: studies/{project})
    #[arg(long)]
    pub source_path: Option<PathBuf>,

    /// Skip loading the graph
    #[arg(long)]
    pub skip_graph: bool,

    /// Skip loading the flat indices
    #[arg(long)]
    pub skip_flat: bool,

    /// Skip loading the document store
    #[arg(long)]
    pub skip_documents: bool,
}

impl LoadStudyArgs {
    /// Study directory to read
    pub fn source_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("studies").join(project_id.project()))
    }

    fn options(&self) -> LoadOptions {
        LoadOptions {
            skip_graph: self.skip_graph,
            skip_flat: self.skip_flat,
            skip_documents: self.skip_documents,
        }
    }

    /// Execute the load-study command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let project_id = match ProjectId::new(&self.project_id) {
            Ok(id) => id,
            Err(e) => {
                eprintln!("Invalid project id: {e}");
                return Ok(2);
            }
        };

        let source = self.source_dir(&project_id);
        if !source.is_dir() {
            eprintln!("{} does not exist", source.display());
            return Ok(2);
        }

        let config = match load_config_or_default(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };
        let (schema, schema_is_default) = match config.dictionary.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                eprintln!("Invalid configuration: {e}");
                return Ok(2);
            }
        };
        if schema_is_default {
            tracing::warn!("DICTIONARY_URL not found in environment using {schema}");
        }

        tracing::info!(
            project_id = %project_id,
            source = %source.display(),
            options = ?self.options(),
            "Loading study"
        );

        let normalizer = Normalizer::new(config.work.file_extension.clone());
        let canonical = {
            let (source, schema) = (source.clone(), schema.clone());
            tokio::task::spawn_blocking(move || normalizer.normalize(&source, &schema)).await??
        };
        println!(
            "normalized {} resources of {} types into {}",
            canonical.total(),
            canonical.resource_types().count(),
            canonical.dir().display()
        );

        let loader = Loader::new(&create_collaborators(&config)?);
        let report = loader
            .load(&canonical, &project_id, &schema, self.options())
            .await;
        for line in report.log.entries() {
            println!("{line}");
        }

        Ok(if report.succeeded { 0 } else { 5 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(source_path: Option<&str>) -> LoadStudyArgs {
        LoadStudyArgs {
            project_id: "aced-Alzheimers".to_string(),
            source_path: source_path.map(PathBuf::from),
            skip_graph: false,
            skip_flat: true,
            skip_documents: false,
        }
    }

    #[test]
    fn test_default_source_dir() {
        let project_id = ProjectId::new("aced-Alzheimers").unwrap();
        assert_eq!(args(None).source_dir(&project_id), Path::new("studies/Alzheimers"));
        assert_eq!(
            args(Some("/data/alz")).source_dir(&project_id),
            Path::new("/data/alz")
        );
    }

    #[test]
    fn test_options_follow_flags() {
        let options = args(None).options();
        assert!(options.skip_flat);
        assert!(!options.skip_graph);
    }

    #[tokio::test]
    async fn test_missing_source_dir() {
        let code = args(Some("/nonexistent/study"))
            .execute("missing.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
