//! Job log and structured job result
//!
//! Every stage returns its own [`JobLog`]; the orchestrator merges them into the
//! single [`JobResult`] that is emitted at the end of the run. Lines are only ever
//! appended, so a failure late in the job never hides what happened earlier.

use super::errors::EtlError;
use super::result::Result;
use serde::{Deserialize, Serialize};

/// Append-only list of human-readable log lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobLog(Vec<String>);

impl JobLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an informational line
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "fhir_etl::job", "{message}");
        self.0.push(message);
    }

    /// Appends a warning line
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "fhir_etl::job", "{message}");
        self.0.push(message);
    }

    /// Appends an error summary followed by its diagnostic trace
    ///
    /// The trace is the error rendered with `context` and its full source chain.
    pub fn exception(&mut self, context: impl Into<String>, err: EtlError) {
        let context = context.into();
        let message = format!("An Exception Occurred: {err}");
        tracing::error!(target: "fhir_etl::job", context = %context, error = %err, "Stage failed");
        let trace = format!("{:?}", anyhow::Error::new(err).context(context));
        self.0.push(message);
        self.0.push(trace);
    }

    /// Appends lines produced by a collaborator, verbatim
    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(lines.into_iter().map(Into::into));
    }

    /// Appends another stage's log
    pub fn append(&mut self, other: JobLog) {
        self.0.extend(other.0);
    }

    /// Lines in order
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|line| line.contains(needle))
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for JobLog {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

/// Reference to the snapshot produced after a `put`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Snapshot object, `null` when the export was refused or failed
    pub object_id: Option<String>,
}

/// Final, caller-visible outcome of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Acting principal
    pub user: Option<String>,

    /// Local paths discovered while materializing commits
    pub files: Vec<String>,

    /// Accumulated log of every stage
    pub logs: JobLog,

    /// Snapshot object of a `get`; present (possibly `null`) only for `get`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<Option<String>>,

    /// Snapshot produced after a `put`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotRef>,
}

impl JobResult {
    /// Creates an empty result for `user`
    pub fn new(user: Option<String>) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }

    /// Result for a job rejected before it ran
    pub fn rejected(user: Option<String>, err: EtlError) -> Self {
        let mut result = Self::new(user);
        result.logs.exception("job rejected", err);
        result
    }

    /// Merges a stage log
    pub fn merge_log(&mut self, log: JobLog) {
        self.logs.append(log);
    }

    /// Records a discovered file path
    pub fn add_file(&mut self, path: impl Into<String>) {
        self.files.push(path.into());
    }

    /// Attaches the exported object of a `get`
    pub fn set_object_id(&mut self, object_id: Option<String>) {
        self.object_id = Some(object_id);
    }

    /// Attaches the snapshot produced after a `put`
    pub fn set_snapshot(&mut self, object_id: Option<String>) {
        self.snapshot = Some(SnapshotRef { object_id });
    }

    /// Exported object of a `get`, if one was produced
    pub fn exported_object_id(&self) -> Option<&str> {
        self.object_id.as_ref().and_then(|id| id.as_deref())
    }

    /// Compact single-line JSON, the last line a caller reads
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_log_append_keeps_order() {
        let mut first = JobLog::new();
        first.info("one");
        let mut second = JobLog::new();
        second.info("two");
        second.extend(vec!["three"]);
        first.append(second);
        assert_eq!(first.entries(), &["one", "two", "three"]);
    }

    #[test]
    fn test_exception_records_message_and_trace() {
        let mut log = JobLog::new();
        log.exception("loading commit c1", EtlError::Download("timeout".into()));
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0], "An Exception Occurred: Download error: timeout");
        assert!(log.entries()[1].contains("loading commit c1"));
        assert!(log.entries()[1].contains("Download error: timeout"));
    }

    #[test]
    fn test_get_result_serializes_null_object_id() {
        let mut result = JobResult::new(Some("someone@example.org".into()));
        result.set_object_id(None);
        let value: Value = serde_json::from_str(&result.to_json_line().unwrap()).unwrap();
        assert!(value.get("object_id").unwrap().is_null());
        assert!(value.get("snapshot").is_none());
    }

    #[test]
    fn test_put_result_serializes_snapshot() {
        let mut result = JobResult::new(None);
        result.set_snapshot(Some("obj-1".into()));
        let value: Value = serde_json::from_str(&result.to_json_line().unwrap()).unwrap();
        assert_eq!(value["snapshot"]["object_id"], "obj-1");
        assert!(value.get("object_id").is_none());
        assert!(value["logs"].is_array());
    }

    #[test]
    fn test_rejected_result_has_log() {
        let result = JobResult::rejected(None, EtlError::UnknownMethod("patch".into()));
        assert!(result.logs.contains("unknown method patch"));
        assert!(result.to_json_line().unwrap().lines().count() == 1);
    }
}
