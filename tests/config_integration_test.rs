//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold `ENV_MUTEX` so they do not
//! interfere with each other.

use fhir_etl::config::{load_config, load_config_or_default, DEFAULT_DICTIONARY_URL};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "FHIR_ETL_APPLICATION_LOG_LEVEL",
        "FHIR_ETL_COMMONS_ENDPOINT",
        "FHIR_ETL_ELASTIC_URL",
        "FHIR_ETL_WORK_STUDIES_ROOT",
        "ACCESS_TOKEN",
        "DICTIONARY_URL",
        "TEST_COMMONS_TOKEN",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"

[commons]
endpoint = "https://commons.example.org"
access_token = "token-123"
timeout_seconds = 60
tls_verify = false

[commons.retry]
max_retries = 5
initial_delay_ms = 500

[elastic]
url = "http://localhost:9200"
index_prefix = "test.aced.io"
fhir_index = "fhir_test"

[dictionary]
url = "https://example.org/dictionary.json"

[work]
studies_root = "/tmp/studies"
file_extension = "json"

[logging]
local_enabled = true
local_path = "/tmp/fhir-etl-logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.commons.endpoint, "https://commons.example.org");
    assert_eq!(
        config
            .commons
            .access_token
            .as_ref()
            .map(|t| t.expose_secret().bearer()),
        Some("Bearer token-123".to_string())
    );
    assert!(!config.commons.tls_verify);
    assert_eq!(config.commons.retry.max_retries, 5);
    assert_eq!(config.elastic.flat_index("patient"), "test.aced.io_patient_0");
    assert_eq!(config.elastic.fhir_index, "fhir_test");
    assert_eq!(config.work.file_extension, "json");
    assert_eq!(config.logging.local_rotation, "hourly");

    let (schema, fell_back) = config.dictionary.resolve().unwrap();
    assert_eq!(schema.as_str(), "https://example.org/dictionary.json");
    assert!(!fell_back);
}

#[test]
fn test_missing_file_uses_defaults_and_environment() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("ACCESS_TOKEN", "env-token");
    std::env::set_var("FHIR_ETL_ELASTIC_URL", "http://elastic.internal:9200");

    let config = load_config_or_default("/nonexistent/fhir-etl.toml").unwrap();
    cleanup_env_vars();

    assert_eq!(config.elastic.url, "http://elastic.internal:9200");
    assert!(config.commons.access_token.is_some());
    let (schema, fell_back) = config.dictionary.resolve().unwrap();
    assert_eq!(schema.as_str(), DEFAULT_DICTIONARY_URL);
    assert!(fell_back);

    assert!(load_config("/nonexistent/fhir-etl.toml").is_err());
}

#[test]
fn test_env_substitution_and_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_COMMONS_TOKEN", "substituted");
    std::env::set_var("FHIR_ETL_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("DICTIONARY_URL", "https://example.org/from-env.json");

    let file = write_config(
        r#"
# access_token = "${NOT_SET_BUT_COMMENTED}"
[application]
log_level = "info"

[commons]
access_token = "${TEST_COMMONS_TOKEN}"

[dictionary]
url = "https://example.org/from-file.json"
"#,
    );
    let result = load_config(file.path());
    cleanup_env_vars();

    let config = result.unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(
        config
            .commons
            .access_token
            .as_ref()
            .map(|t| t.expose_secret().bearer()),
        Some("Bearer substituted".to_string())
    );
    assert_eq!(
        config.dictionary.resolve().unwrap().0.as_str(),
        "https://example.org/from-env.json"
    );
}

#[test]
fn test_missing_substitution_variable_fails() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[commons]\naccess_token = \"${TEST_COMMONS_TOKEN}\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_COMMONS_TOKEN"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let bad_rotation = write_config("[logging]\nlocal_rotation = \"size\"\n");
    assert!(load_config(bad_rotation.path()).is_err());

    let bad_retries = write_config("[commons.retry]\nmax_retries = 0\n");
    assert!(load_config(bad_retries.path()).is_err());

    let bad_url = write_config("[elastic]\nurl = \"elastic\"\n");
    assert!(load_config(bad_url.path()).is_err());
}

#[test]
fn test_debug_output_redacts_token() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[commons]\naccess_token = \"super-secret-token\"\n");
    let config = load_config(file.path()).unwrap();
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("super-secret-token"));
}
