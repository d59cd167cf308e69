//! Requirement derivation and evaluation

use crate::domain::{ActorProfile, JobLog, ProjectId};
use std::fmt;

/// Kind of operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// put, reset and empty
    Create,
    /// get
    Read,
}

impl OperationKind {
    /// Action name checked in the actor's grants
    pub fn action(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read-storage",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// One condition the actor's profile must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The path must be listed in the profile's resources
    Resource(String),
    /// The profile must hold `action` on `path` for every service
    Grant { path: String, action: String },
}

/// Every requirement of one operation on one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequirement {
    requirements: Vec<Requirement>,
}

impl OperationRequirement {
    /// Requirements of `kind` on `project_id`
    ///
    /// The program and the program's project listing must be visible, and the
    /// action must be granted on the project itself.
    pub fn for_project(project_id: &ProjectId, kind: OperationKind) -> Self {
        let program = format!("/programs/{}", project_id.program());
        Self {
            requirements: vec![
                Requirement::Resource(program.clone()),
                Requirement::Resource(format!("{program}/projects")),
                Requirement::Grant {
                    path: project_id.resource_path(),
                    action: kind.action().to_string(),
                },
            ],
        }
    }

    /// Requirements in evaluation order
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

/// Outcome of an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether every requirement held
    pub granted: bool,
    /// One line per requirement, in order
    pub trace: JobLog,
}

/// Evaluates every requirement against `profile`
///
/// Evaluation never short-circuits and never fails: a missing resource or
/// authz key simply fails that requirement.
pub fn evaluate(requirements: &OperationRequirement, profile: &ActorProfile) -> GateDecision {
    let mut granted = true;
    let mut trace = JobLog::new();

    for requirement in requirements.requirements() {
        match requirement {
            Requirement::Resource(path) => {
                if profile.resources.iter().any(|r| r == path) {
                    trace.info(format!("HAS RESOURCE {path}"));
                } else {
                    trace.warn(format!("{path} not found in user resources"));
                    granted = false;
                }
            }
            Requirement::Grant { path, action } => match profile.authz.get(path) {
                None => {
                    trace.warn(format!("{path} not found in user authz"));
                    granted = false;
                }
                Some(grants) if grants.iter().any(|g| g.allows(action)) => {
                    trace.info(format!("HAS SERVICE {action} on resource {path}"));
                }
                Some(_) => {
                    trace.warn(format!("{action} not found in user authz for {path}"));
                    granted = false;
                }
            },
        }
    }

    GateDecision { granted, trace }
}

/// Derives and evaluates the requirements of `kind` on `project_id`
pub fn authorize(project_id: &ProjectId, kind: OperationKind, profile: &ActorProfile) -> GateDecision {
    evaluate(&OperationRequirement::for_project(project_id, kind), profile)
}
