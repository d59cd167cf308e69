//! Job orchestration
//!
//! Dispatches a validated job description to the put, get or delete flow.

pub mod orchestrator;

pub use orchestrator::{JobOrchestrator, JobOutcome, JobSettings, JobStatus, MANIFEST_FILE_NAME};
