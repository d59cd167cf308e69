//! Authorization gate
//!
//! Decides whether an actor may create in or read from a project, and explains
//! the decision with one trace line per requirement.

pub mod gate;

pub use gate::{authorize, evaluate, GateDecision, OperationKind, OperationRequirement, Requirement};
