//! Configuration schema types
//!
//! This module defines the configuration structure for the ETL job. Every section
//! has defaults so the job can run from environment variables alone.

use crate::config::SecretString;
use crate::domain::SchemaRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dictionary used when neither the file nor `DICTIONARY_URL` names one
pub const DEFAULT_DICTIONARY_URL: &str = "https://aced-public.s3.us-west-2.amazonaws.com/aced-test.json";

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Commons services (identity, object store, graph, discovery)
    #[serde(default)]
    pub commons: CommonsConfig,

    /// Elasticsearch backing the flat indices and the FHIR document store
    #[serde(default)]
    pub elastic: ElasticConfig,

    /// Data dictionary
    #[serde(default)]
    pub dictionary: DictionaryConfig,

    /// Local working directories
    #[serde(default)]
    pub work: WorkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EtlConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.commons.validate()?;
        self.elastic.validate()?;
        self.dictionary.validate()?;
        self.work.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 || self.max_retries > 10 {
            return Err(format!(
                "retry.max_retries must be between 1 and 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err("retry.backoff_multiplier must be >= 1.0".to_string());
        }
        Ok(())
    }
}

/// Commons services configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonsConfig {
    /// Base URL of the commons (identity, fence, sheepdog, metadata service)
    #[serde(default = "default_commons_endpoint")]
    pub endpoint: String,

    /// Access token of the acting principal
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CommonsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_commons_endpoint(),
            access_token: None,
            timeout_seconds: default_timeout_seconds(),
            tls_verify: true,
            retry: RetryConfig::default(),
        }
    }
}

impl CommonsConfig {
    fn validate(&self) -> Result<(), String> {
        validate_url("commons.endpoint", &self.endpoint)?;
        if self.timeout_seconds == 0 {
            return Err("commons.timeout_seconds must be > 0".to_string());
        }
        self.retry.validate()
    }
}

/// Elasticsearch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticConfig {
    /// Elasticsearch URL
    #[serde(default = "default_elastic_url")]
    pub url: String,

    /// Prefix of the flat indices, e.g. `gen3.aced.io` -> `gen3.aced.io_patient_0`
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// Index holding FHIR documents
    #[serde(default = "default_fhir_index")]
    pub fhir_index: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            url: default_elastic_url(),
            index_prefix: default_index_prefix(),
            fhir_index: default_fhir_index(),
            request_timeout_seconds: default_timeout_seconds(),
            retry: RetryConfig::default(),
        }
    }
}

impl ElasticConfig {
    fn validate(&self) -> Result<(), String> {
        validate_url("elastic.url", &self.url)?;
        if self.index_prefix.trim().is_empty() {
            return Err("elastic.index_prefix cannot be empty".to_string());
        }
        if self.fhir_index.trim().is_empty() {
            return Err("elastic.fhir_index cannot be empty".to_string());
        }
        self.retry.validate()
    }

    /// Physical name of a flat index
    pub fn flat_index(&self, index: &str) -> String {
        format!("{}_{}_0", self.index_prefix, index)
    }
}

/// Data dictionary configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryConfig {
    /// Dictionary URL; the default dictionary is used when unset
    #[serde(default)]
    pub url: Option<String>,
}

impl DictionaryConfig {
    fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err("dictionary.url cannot be empty when set".to_string());
            }
        }
        Ok(())
    }

    /// Dictionary reference, and whether the default had to be used
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved reference is blank.
    pub fn resolve(&self) -> Result<(SchemaRef, bool), String> {
        let (url, fell_back) = match self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => (url, false),
            None => (DEFAULT_DICTIONARY_URL, true),
        };
        SchemaRef::new(url).map(|schema| (schema, fell_back))
    }
}

/// Local working directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    /// Root of the per-project studies directories
    #[serde(default = "default_studies_root")]
    pub studies_root: PathBuf,

    /// Extension of dataset files inside a commit archive
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            studies_root: default_studies_root(),
            file_extension: default_file_extension(),
        }
    }
}

impl WorkConfig {
    fn validate(&self) -> Result<(), String> {
        if self.studies_root.as_os_str().is_empty() {
            return Err("work.studies_root cannot be empty".to_string());
        }
        if self.file_extension.trim().is_empty() || self.file_extension.starts_with('.') {
            return Err(format!(
                "work.file_extension must be a bare extension like 'ndjson', got '{}'",
                self.file_extension
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Maximum log file size in MB
    #[serde(default = "default_local_max_size_mb")]
    pub local_max_size_mb: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_size_mb: default_local_max_size_mb(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_size_mb == 0 {
            return Err("logging.local_max_size_mb must be > 0".to_string());
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    let parsed = url::Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("{field} must start with http:// or https://"));
    }
    Ok(())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_commons_endpoint() -> String {
    "http://revproxy-service".to_string()
}

fn default_elastic_url() -> String {
    "http://esproxy-service:9200".to_string()
}

fn default_index_prefix() -> String {
    "gen3.aced.io".to_string()
}

fn default_fhir_index() -> String {
    "fhir".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_studies_root() -> PathBuf {
    PathBuf::from("/root/studies")
}

fn default_file_extension() -> String {
    "ndjson".to_string()
}

fn default_local_path() -> String {
    "/var/log/fhir-etl".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_size_mb() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EtlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.elastic.flat_index("patient"), "gen3.aced.io_patient_0");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = EtlConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("log_level"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = EtlConfig::default();
        config.commons.endpoint = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
        config.commons.endpoint = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_extension() {
        let mut config = EtlConfig::default();
        config.work.file_extension = ".ndjson".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_bounds() {
        let mut config = EtlConfig::default();
        config.elastic.retry.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dictionary_resolution() {
        let (schema, fell_back) = DictionaryConfig::default().resolve().unwrap();
        assert!(fell_back);
        assert_eq!(schema.as_str(), DEFAULT_DICTIONARY_URL);

        let configured = DictionaryConfig {
            url: Some("https://example.org/dictionary.json".to_string()),
        };
        let (schema, fell_back) = configured.resolve().unwrap();
        assert!(!fell_back);
        assert_eq!(schema.as_str(), "https://example.org/dictionary.json");
    }
}
