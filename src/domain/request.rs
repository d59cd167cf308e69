//! Job description parsing
//!
//! A job arrives as one JSON object (the `INPUT_DATA` payload). Parsing validates
//! every field up front so that a malformed description is rejected before any
//! network or store call is made.

use super::errors::EtlError;
use super::ids::{CommitId, ObjectId, ProjectId};
use super::result::Result;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Requested job method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMethod {
    /// Import commits from the bucket into the graph, flat and document stores
    Put,
    /// Export the document store to a snapshot object
    Get,
    /// Empty the project or reset it to a commit
    Delete,
}

impl fmt::Display for JobMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobMethod::Put => "put",
            JobMethod::Get => "get",
            JobMethod::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl FromStr for JobMethod {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "put" => Ok(JobMethod::Put),
            "get" => Ok(JobMethod::Get),
            "delete" => Ok(JobMethod::Delete),
            _ => Err(EtlError::UnknownMethod(s.to_string())),
        }
    }
}

/// One dataset commit to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Bucket object holding the zipped commit
    pub object_id: ObjectId,
    /// Commit identifier, names the working area
    pub commit_id: CommitId,
    /// File name the object is staged under
    pub meta_path: String,
}

/// What the job should do, with the parameters each branch needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Import the listed commits, in order
    Put { commits: Vec<Commit> },
    /// Export a snapshot
    Get,
    /// Roll the project back to the manifest stored in `object_id`
    Reset {
        commit_id: CommitId,
        object_id: ObjectId,
    },
    /// Remove everything loaded for the project
    Empty,
}

/// Validated job description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Target program/project
    pub project_id: ProjectId,
    /// Requested action
    pub action: JobAction,
}

#[derive(Debug, Deserialize)]
struct RawJobRequest {
    method: Option<String>,
    project_id: Option<String>,
    push: Option<RawPush>,
    commit_id: Option<String>,
    object_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPush {
    commits: Option<Vec<RawCommit>>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    object_id: Option<String>,
    commit_id: Option<String>,
    meta_path: Option<String>,
}

impl JobRequest {
    /// Parses and validates a job description
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::MalformedRequest`] for invalid JSON, a missing or
    /// malformed `project_id`, a missing `method`, missing commit fields, or a
    /// delete naming only one of `commit_id`/`object_id`. Returns
    /// [`EtlError::UnknownMethod`] for a method other than put, get or delete.
    ///
    /// # Examples
    ///
    /// ```
    /// use fhir_etl::domain::request::{JobAction, JobRequest};
    ///
    /// let request = JobRequest::parse(r#"{"method": "get", "project_id": "aced-Diabetes"}"#).unwrap();
    /// assert_eq!(request.action, JobAction::Get);
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let raw: RawJobRequest = serde_json::from_str(input)
            .map_err(|e| EtlError::MalformedRequest(format!("input data is not valid JSON: {e}")))?;

        let project_id = raw
            .project_id
            .as_deref()
            .ok_or_else(|| EtlError::MalformedRequest("project_id not found in input data".into()))
            .and_then(|id| ProjectId::new(id).map_err(EtlError::MalformedRequest))?;

        let method: JobMethod = raw
            .method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| EtlError::MalformedRequest("input data must contain a `method`".into()))?
            .parse()?;

        let action = match method {
            JobMethod::Put => JobAction::Put {
                commits: parse_commits(raw.push)?,
            },
            JobMethod::Get => JobAction::Get,
            JobMethod::Delete => match (raw.commit_id, raw.object_id) {
                (Some(commit_id), Some(object_id)) => JobAction::Reset {
                    commit_id: CommitId::new(commit_id).map_err(EtlError::MalformedRequest)?,
                    object_id: ObjectId::new(object_id).map_err(EtlError::MalformedRequest)?,
                },
                (None, None) => JobAction::Empty,
                _ => {
                    return Err(EtlError::MalformedRequest(
                        "delete requires both `commit_id` and `object_id`, or neither".into(),
                    ))
                }
            },
        };

        Ok(Self { project_id, action })
    }

    /// Method this request was parsed from
    pub fn method(&self) -> JobMethod {
        match self.action {
            JobAction::Put { .. } => JobMethod::Put,
            JobAction::Get => JobMethod::Get,
            JobAction::Reset { .. } | JobAction::Empty => JobMethod::Delete,
        }
    }
}

fn parse_commits(push: Option<RawPush>) -> Result<Vec<Commit>> {
    let commits = push
        .ok_or_else(|| EtlError::MalformedRequest("input data must contain a `push`".into()))?
        .commits
        .unwrap_or_default();

    if commits.is_empty() {
        return Err(EtlError::MalformedRequest(
            "`push.commits` must not be empty".into(),
        ));
    }

    commits
        .into_iter()
        .map(|raw| {
            let object_id = raw
                .object_id
                .ok_or_else(|| EtlError::MalformedRequest("commit must contain an `object_id`".into()))
                .and_then(|id| ObjectId::new(id).map_err(EtlError::MalformedRequest))?;
            let commit_id = raw
                .commit_id
                .ok_or_else(|| EtlError::MalformedRequest("commit must contain a `commit_id`".into()))
                .and_then(|id| CommitId::new(id).map_err(EtlError::MalformedRequest))?;
            let meta_path = raw
                .meta_path
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| EtlError::MalformedRequest("commit must contain a `meta_path`".into()))?;
            Ok(Commit {
                object_id,
                commit_id,
                meta_path,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_put() {
        let input = r#"{
            "method": "put",
            "project_id": "aced-Alzheimers",
            "push": {"commits": [
                {"object_id": "o1", "commit_id": "c1", "meta_path": "c1.zip"},
                {"object_id": "o2", "commit_id": "c2", "meta_path": "c2.zip"}
            ]}
        }"#;
        let request = JobRequest::parse(input).unwrap();
        assert_eq!(request.method(), JobMethod::Put);
        match request.action {
            JobAction::Put { commits } => {
                assert_eq!(commits.len(), 2);
                assert_eq!(commits[0].commit_id.as_str(), "c1");
                assert_eq!(commits[1].meta_path, "c2.zip");
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test_case("PUT"; "upper case")]
    #[test_case("Put"; "mixed case")]
    fn test_method_is_case_insensitive(method: &str) {
        assert_eq!(method.parse::<JobMethod>().unwrap(), JobMethod::Put);
    }

    #[test]
    fn test_parse_reset_and_empty() {
        let reset = JobRequest::parse(
            r#"{"method": "delete", "project_id": "aced-Diabetes", "commit_id": "c1", "object_id": "o1"}"#,
        )
        .unwrap();
        assert!(matches!(reset.action, JobAction::Reset { .. }));

        let empty =
            JobRequest::parse(r#"{"method": "delete", "project_id": "aced-Diabetes"}"#).unwrap();
        assert_eq!(empty.action, JobAction::Empty);
    }

    #[test_case(r#"{"method": "get", "project_id": "acedDiabetes"}"#; "no dash")]
    #[test_case(r#"{"method": "get"}"#; "no project")]
    #[test_case(r#"{"project_id": "aced-Diabetes"}"#; "no method")]
    #[test_case(r#"{"method": "put", "project_id": "aced-Diabetes"}"#; "put without push")]
    #[test_case(r#"{"method": "put", "project_id": "aced-Diabetes", "push": {"commits": []}}"#; "put without commits")]
    #[test_case(r#"{"method": "put", "project_id": "aced-Diabetes", "push": {"commits": [{"object_id": "", "commit_id": "c1", "meta_path": "m"}]}}"#; "empty object id")]
    #[test_case(r#"{"method": "put", "project_id": "aced-Diabetes", "push": {"commits": [{"object_id": "o1", "meta_path": "m"}]}}"#; "missing commit id")]
    #[test_case(r#"{"method": "delete", "project_id": "aced-Diabetes", "commit_id": "c1"}"#; "delete with only commit id")]
    #[test_case(r#"{"method": "put", "project_id": "aced-Diabetes", "push": {"commits": [{"object_id": "o1", "commit_id": "/var/data", "meta_path": "m"}]}}"#; "absolute commit id")]
    #[test_case(r#"{"method": "delete", "project_id": "aced-Diabetes", "commit_id": "../..", "object_id": "o1"}"#; "parent commit id")]
    #[test_case("not json"; "invalid json")]
    fn test_malformed_requests(input: &str) {
        let err = JobRequest::parse(input).unwrap_err();
        assert!(matches!(err, EtlError::MalformedRequest(_)), "got {err:?}");
    }

    #[test]
    fn test_unknown_method() {
        let err = JobRequest::parse(r#"{"method": "patch", "project_id": "aced-Diabetes"}"#)
            .unwrap_err();
        assert!(matches!(err, EtlError::UnknownMethod(ref m) if m == "patch"));
        assert!(err.is_fatal());
    }
}
