//! Integration tests for logging functionality

use fhir_etl::config::LoggingConfig;
use fhir_etl::logging::{init_logging, parse_log_level};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert_eq!(config.local_path, "/var/log/fhir-etl");
}

#[test]
fn test_invalid_level_is_rejected_before_initialization() {
    let err = init_logging("verbose", &LoggingConfig::default()).err().unwrap();
    assert!(err.to_string().contains("Invalid log level"));
    assert!(parse_log_level("WARN").is_ok());
}

// A subscriber can only be installed once per process, so every initialization
// check lives in this one test.
#[test]
fn test_file_logging_creates_directory_and_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");
    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
        local_max_size_mb: 100,
    };

    let guard = init_logging("info", &config).unwrap();
    assert!(log_path.is_dir());

    tracing::info!(target: "fhir_etl::job", "LOADED aced-Alzheimers");
    drop(guard);

    let contents = std::fs::read_to_string(log_path.join("fhir-etl.log")).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("LOADED aced-Alzheimers"))
        .expect("job line written to the log file");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["target"], "fhir_etl::job");
    assert_eq!(event["level"], "INFO");

    assert!(init_logging("info", &LoggingConfig::default()).is_err());
}
