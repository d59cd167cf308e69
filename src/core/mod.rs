//! Core business logic for the ETL job.
//!
//! # Modules
//!
//! - [`authz`] - Authorization gate over actor profiles
//! - [`materialize`] - Commit download and archive expansion into working areas
//! - [`normalize`] - Raw study files to canonical sets
//! - [`load`] - Fan-out of a canonical set into the derived stores
//! - [`export`] - Document store snapshots uploaded to the bucket
//! - [`reconcile`] - Emptying a project or resetting it to a manifest
//! - [`job`] - One job run from request to result
//!
//! # Job Workflow
//!
//! 1. **Parse**: Validate the job description
//! 2. **Identify**: Resolve the access token to an actor profile
//! 3. **Authorize**: Check create or read grants on the project
//! 4. **Materialize**: Download and expand each commit (put) or the manifest (reset)
//! 5. **Normalize and load**: Write canonical sets into graph, flat, discovery and document stores
//! 6. **Export**: Snapshot the document store after a put and for a get
//! 7. **Report**: Emit the accumulated [`crate::domain::JobResult`]
//!
//! # Example
//!
//! ```rust,no_run
//! use fhir_etl::adapters::create_collaborators;
//! use fhir_etl::config::{load_config_or_default, secret_string};
//! use fhir_etl::core::job::{JobOrchestrator, JobSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config_or_default("fhir-etl.toml")?;
//! let orchestrator = JobOrchestrator::new(
//!     create_collaborators(&config)?,
//!     JobSettings::from_config(&config)?,
//! );
//!
//! let outcome = orchestrator
//!     .run(
//!         r#"{"method": "get", "project_id": "aced-Alzheimers"}"#,
//!         &secret_string("token".to_string()),
//!     )
//!     .await;
//! println!("{}", outcome.result.to_json_line()?);
//! # Ok(())
//! # }
//! ```

pub mod authz;
pub mod export;
pub mod job;
pub mod load;
pub mod materialize;
pub mod normalize;
pub mod reconcile;
