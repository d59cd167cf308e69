// fhir-etl - Commit-based study synchronization job
// Copyright (c) 2025 fhir-etl Contributors
// Licensed under the MIT License

//! # fhir-etl - commit-based study synchronization
//!
//! fhir-etl moves clinical-study datasets between object storage and the derived
//! stores of a data commons: a graph metadata store, a flat search index, a FHIR
//! document store and a discovery summary. Every run is one job on one project.
//!
//! ## Overview
//!
//! - **put** imports dataset commits from the bucket, then uploads a snapshot
//! - **get** exports the document store of a project as a snapshot object
//! - **delete** empties a project, or resets it to the manifest of a prior commit
//!
//! Every job is gated by the actor's grants on the project, and every stage
//! appends to a log that is returned with the job result.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (authorization, materialization, loading, export, reconciliation)
//! - [`adapters`] - Collaborators: object store, graph, search, documents, discovery, archive
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fhir_etl::adapters::memory::MemoryStores;
//! use fhir_etl::config::secret_string;
//! use fhir_etl::core::job::{JobOrchestrator, JobSettings};
//! use fhir_etl::domain::{ActorProfile, SchemaRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stores = MemoryStores::new(ActorProfile::new("someone@example.org"));
//!     let settings = JobSettings {
//!         studies_root: "/tmp/studies".into(),
//!         file_extension: "ndjson".to_string(),
//!         schema: SchemaRef::new("https://example.org/dictionary.json")?,
//!         schema_is_default: false,
//!     };
//!     let orchestrator = JobOrchestrator::new(stores.collaborators(), settings);
//!
//!     let outcome = orchestrator
//!         .run(
//!             r#"{"method": "get", "project_id": "aced-Alzheimers"}"#,
//!             &secret_string("token".to_string()),
//!         )
//!         .await;
//!     println!("{}", outcome.result.to_json_line()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`] with [`domain::EtlError`].
//! Stages catch their own errors and record them in the job log; only a malformed
//! request or a failed identity lookup ends a job early.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
