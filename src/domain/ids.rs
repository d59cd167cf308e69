//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through a job. Each type
//! rejects empty values at construction so downstream code never has to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

/// Rejects values that would not stay a single directory name when joined onto a path
fn check_path_segment(label: &str, id: &str) -> Result<(), String> {
    let mut components = Path::new(id).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == id
    );
    if single_normal && !id.contains('\\') {
        Ok(())
    } else {
        Err(format!("{label} must be a plain name without path separators, got '{id}'"))
    }
}

fn accept_any(_label: &str, _id: &str) -> Result<(), String> {
    Ok(())
}

/// Program/project identifier
///
/// Written as `{program}-{project}`; exactly one `-` separating two non-empty
/// segments.
///
/// # Examples
///
/// ```
/// use fhir_etl::domain::ids::ProjectId;
/// use std::str::FromStr;
///
/// let project_id = ProjectId::from_str("aced-Alzheimers").unwrap();
/// assert_eq!(project_id.program(), "aced");
/// assert_eq!(project_id.project(), "Alzheimers");
/// assert_eq!(project_id.to_string(), "aced-Alzheimers");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId {
    program: String,
    project: String,
}

impl ProjectId {
    /// Parses a `{program}-{project}` string
    ///
    /// # Returns
    ///
    /// Returns `Ok(ProjectId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl AsRef<str>) -> Result<Self, String> {
        let id = id.as_ref();
        let segments: Vec<&str> = id.split('-').collect();
        match segments.as_slice() {
            [program, project] if !program.trim().is_empty() && !project.trim().is_empty() => {
                check_path_segment("project_id", id)?;
                Ok(Self {
                    program: (*program).to_string(),
                    project: (*project).to_string(),
                })
            }
            _ => Err(format!(
                "project_id must be in the format <program>-<project>, got '{id}'"
            )),
        }
    }

    /// Builds a project ID from its two segments
    pub fn from_parts(program: impl Into<String>, project: impl Into<String>) -> Result<Self, String> {
        Self::new(format!("{}-{}", program.into(), project.into()))
    }

    /// Program segment
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Project segment
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Authorization resource path of the project
    pub fn resource_path(&self) -> String {
        format!("/programs/{}/projects/{}", self.program, self.project)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.program, self.project)
    }
}

impl FromStr for ProjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.to_string()
    }
}

macro_rules! non_empty_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        non_empty_id!($(#[$meta])* $name, $label, accept_any);
    };
    ($(#[$meta:meta])* $name:ident, $label:literal, $check:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new ", stringify!($name), ", rejecting blank values")]
            pub fn new(id: impl Into<String>) -> Result<Self, String> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(concat!($label, " must not be empty").to_string());
                }
                $check($label, &id)?;
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

non_empty_id!(
    /// Identifier of a dataset commit pushed by the submission client
    ///
    /// Names the commit's working directory, so it must be a single plain path
    /// segment.
    CommitId,
    "commit_id",
    check_path_segment
);

non_empty_id!(
    /// Identifier of an object in the project's bucket
    ObjectId,
    "object_id"
);

non_empty_id!(
    /// Reference to the data dictionary (usually a URL) passed through to the stores
    SchemaRef,
    "dictionary reference"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_creation() {
        let id = ProjectId::new("aced-Alcoholism").unwrap();
        assert_eq!(id.program(), "aced");
        assert_eq!(id.project(), "Alcoholism");
        assert_eq!(id.resource_path(), "/programs/aced/projects/Alcoholism");
    }

    #[test]
    fn test_project_id_requires_dash() {
        assert!(ProjectId::new("acedAlcoholism").is_err());
    }

    #[test]
    fn test_project_id_rejects_empty_segments() {
        assert!(ProjectId::new("-Alcoholism").is_err());
        assert!(ProjectId::new("aced-").is_err());
        assert!(ProjectId::new("-").is_err());
        assert!(ProjectId::new("").is_err());
    }

    #[test]
    fn test_project_id_rejects_extra_segments() {
        assert!(ProjectId::new("aced-Breast-Cancer").is_err());
    }

    #[test]
    fn test_project_id_from_parts() {
        let id = ProjectId::from_parts("aced", "Diabetes").unwrap();
        assert_eq!(id.to_string(), "aced-Diabetes");
    }

    #[test]
    fn test_project_id_serde_as_string() {
        let id = ProjectId::new("aced-Diabetes").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"aced-Diabetes\"");
        let back: ProjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ProjectId>("\"nodash\"").is_err());
    }

    #[test]
    fn test_commit_id_empty_fails() {
        assert!(CommitId::new("").is_err());
        assert!(CommitId::new("   ").is_err());
        assert_eq!(CommitId::new("c1").unwrap().as_str(), "c1");
    }

    #[test]
    fn test_commit_id_rejects_path_escapes() {
        for id in ["/var/data", "..", ".", "../other", "a/b", "a\\b", "c1/"] {
            assert!(CommitId::new(id).is_err(), "{id} accepted");
        }
        assert!(CommitId::new("3f2a9c1").is_ok());
        assert!(CommitId::new("commit.v2").is_ok());
    }

    #[test]
    fn test_project_id_rejects_path_separators() {
        assert!(ProjectId::new("/etc-passwd").is_err());
        assert!(ProjectId::new("aced-../x").is_err());
        assert!(ProjectId::new("aced-a\\b").is_err());
    }

    #[test]
    fn test_object_id_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<ObjectId>("\"\"").is_err());
        let id: ObjectId = serde_json::from_str("\"dg.XXXX/1234\"").unwrap();
        assert_eq!(id.to_string(), "dg.XXXX/1234");
    }
}
