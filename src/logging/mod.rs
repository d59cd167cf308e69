//! Logging and observability
//!
//! Structured logging with `tracing`:
//! - Human-readable console output on stderr (stdout carries only the job result)
//! - Configurable log levels, overridable with `RUST_LOG`
//! - Optional JSON log files with rotation
//!
//! Every [`crate::domain::JobLog`] line is also emitted as an event with the
//! `fhir_etl::job` target, so the file log holds the same story the caller reads.
//!
//! # Example
//!
//! ```no_run
//! use fhir_etl::logging::init_logging;
//! use fhir_etl::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Job started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log how a job ended
///
/// # Example
///
/// ```no_run
/// use fhir_etl::log_job_outcome;
///
/// log_job_outcome!("someone@example.org", "Completed", 0);
/// ```
#[macro_export]
macro_rules! log_job_outcome {
    ($user:expr, $status:expr, $exit_code:expr) => {
        tracing::info!(
            user = %$user,
            status = %$status,
            exit_code = $exit_code,
            "Job finished"
        );
    };
}
