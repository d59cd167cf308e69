//! Run command implementation
//!
//! Executes one job and prints its result as compact JSON on the last stdout
//! line. Diagnostics go to stderr.

use crate::adapters::create_collaborators;
use crate::config::{load_config_or_default, ACCESS_TOKEN_VAR};
use crate::core::job::{JobOrchestrator, JobSettings, JobStatus};
use crate::domain::{EtlError, JobResult};
use crate::log_job_outcome;
use clap::Args;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job description as JSON
    #[arg(long, env = "INPUT_DATA")]
    pub input: Option<String>,
}

/// Exit code for how a job ended
pub fn exit_code(status: JobStatus) -> i32 {
    match status {
        JobStatus::Completed => 0,
        JobStatus::IdentityFailed => 1,
        JobStatus::Rejected => 2,
    }
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config_or_default(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let Some(input) = self.input.as_deref().filter(|i| !i.trim().is_empty()) else {
            let err = EtlError::MalformedRequest("INPUT_DATA not found in environment".to_string());
            emit(&JobResult::rejected(None, err))?;
            return Ok(2);
        };

        let Some(token) = config.commons.access_token.clone() else {
            let mut result = JobResult::new(None);
            result.logs.exception(
                "reading access token",
                EtlError::Authentication(format!("{ACCESS_TOKEN_VAR} not found in environment")),
            );
            emit(&result)?;
            return Ok(1);
        };

        let settings = match JobSettings::from_config(&config) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(error = %e, "Invalid dictionary configuration");
                eprintln!("Invalid configuration: {e}");
                return Ok(2);
            }
        };

        let orchestrator = JobOrchestrator::new(create_collaborators(&config)?, settings);
        let outcome = orchestrator.run(input, &token).await;

        let code = exit_code(outcome.status);
        log_job_outcome!(
            outcome.result.user.as_deref().unwrap_or("-"),
            format!("{:?}", outcome.status),
            code
        );
        emit(&outcome.result)?;
        Ok(code)
    }
}

fn emit(result: &JobResult) -> anyhow::Result<()> {
    println!("{}", result.to_json_line()?);
    Ok(())
}
