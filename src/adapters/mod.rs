//! External system integrations.
//!
//! Each collaborator of the job is a trait with one HTTP-backed implementation
//! and one in-memory implementation:
//!
//! - [`identity`] - actor profile lookup
//! - [`object_store`] - bucket downloads and uploads
//! - [`graph`] - graph metadata store
//! - [`search`] - flat per-type indices
//! - [`documents`] - FHIR document store
//! - [`discovery`] - discovery summaries
//! - [`archive`] - zip expansion and packing
//!
//! [`factory::create_collaborators`] wires the production implementations from
//! configuration. The in-memory implementations can share a
//! [`memory::CallRecorder`] to assert call order across stores.

pub mod archive;
pub mod discovery;
pub mod documents;
pub mod elastic;
pub mod factory;
pub mod graph;
pub mod http;
pub mod identity;
pub mod memory;
pub mod object_store;
pub mod search;

pub use factory::{create_collaborators, Collaborators};
