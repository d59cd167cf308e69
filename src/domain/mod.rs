//! Domain models and types.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`ProjectId`], [`CommitId`], [`ObjectId`], [`SchemaRef`])
//! - **Job description** ([`JobRequest`], [`JobAction`], [`Commit`])
//! - **Authorization input** ([`ActorProfile`], [`AuthzGrant`])
//! - **Reconciliation input** ([`Manifest`])
//! - **Canonical records** ([`CanonicalRecord`]) exchanged with the stores
//! - **Job output** ([`JobResult`], [`JobLog`])
//! - **Error types** ([`EtlError`], [`StoreError`]) and the [`Result`] alias
//!
//! # Validation
//!
//! A job description is validated completely when parsed:
//!
//! ```rust
//! use fhir_etl::domain::{EtlError, JobRequest};
//!
//! let err = JobRequest::parse(r#"{"method": "get", "project_id": "nodash"}"#).unwrap_err();
//! assert!(matches!(err, EtlError::MalformedRequest(_)));
//! ```

pub mod canonical;
pub mod errors;
pub mod ids;
pub mod job_result;
pub mod manifest;
pub mod profile;
pub mod request;
pub mod resource;
pub mod result;

// Re-export commonly used types for convenience
pub use canonical::{CanonicalRecord, Relation};
pub use errors::{EtlError, StoreError, StoreKind};
pub use ids::{CommitId, ObjectId, ProjectId, SchemaRef};
pub use job_result::{JobLog, JobResult, SnapshotRef};
pub use manifest::{Manifest, ManifestEntry};
pub use profile::{ActorProfile, AuthzGrant};
pub use request::{Commit, JobAction, JobMethod, JobRequest};
pub use resource::ResourceType;
pub use result::Result;
