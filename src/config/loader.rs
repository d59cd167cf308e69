//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::EtlConfig;
use super::secret::secret_string_opt;
use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Environment variable carrying the acting principal's token
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";

/// Environment variable naming the data dictionary
pub const DICTIONARY_URL_VAR: &str = "DICTIONARY_URL";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into EtlConfig
/// 4. Applies environment variable overrides (FHIR_ETL_* prefix, ACCESS_TOKEN, DICTIONARY_URL)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is missing
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use fhir_etl::config::loader::load_config;
///
/// let config = load_config("fhir-etl.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EtlConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(EtlError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        EtlError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let config: EtlConfig = toml::from_str(&contents)
        .map_err(|e| EtlError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    finish(config)
}

/// Loads configuration from `path` if it exists, otherwise from defaults
///
/// The job usually runs in a container configured only through environment
/// variables, so a missing file is not an error here. Overrides and validation
/// apply either way.
///
/// # Errors
///
/// Returns an error if an existing file is invalid or validation fails.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<EtlConfig> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "No configuration file, using defaults");
        finish(EtlConfig::default())
    }
}

fn finish(mut config: EtlConfig) -> Result<EtlConfig> {
    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        EtlError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| EtlError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        // Comments are copied untouched
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(EtlError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides
///
/// Variables follow the pattern FHIR_ETL_<SECTION>_<KEY>, e.g.
/// FHIR_ETL_COMMONS_ENDPOINT or FHIR_ETL_ELASTIC_URL. The job-level variables
/// `ACCESS_TOKEN` and `DICTIONARY_URL` are honored as well and take precedence.
fn apply_env_overrides(config: &mut EtlConfig) {
    if let Ok(val) = std::env::var("FHIR_ETL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Commons overrides
    if let Ok(val) = std::env::var("FHIR_ETL_COMMONS_ENDPOINT") {
        config.commons.endpoint = val;
    }
    if let Ok(val) = std::env::var("FHIR_ETL_COMMONS_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.commons.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("FHIR_ETL_COMMONS_TLS_VERIFY") {
        config.commons.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FHIR_ETL_COMMONS_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.commons.retry.max_retries = retries;
        }
    }
    if let Some(token) = secret_string_opt(std::env::var(ACCESS_TOKEN_VAR).ok()) {
        config.commons.access_token = Some(token);
    }

    // Elastic overrides
    if let Ok(val) = std::env::var("FHIR_ETL_ELASTIC_URL") {
        config.elastic.url = val;
    }
    if let Ok(val) = std::env::var("FHIR_ETL_ELASTIC_INDEX_PREFIX") {
        config.elastic.index_prefix = val;
    }
    if let Ok(val) = std::env::var("FHIR_ETL_ELASTIC_FHIR_INDEX") {
        config.elastic.fhir_index = val;
    }

    if let Ok(val) = std::env::var(DICTIONARY_URL_VAR) {
        if !val.trim().is_empty() {
            config.dictionary.url = Some(val);
        }
    }

    // Work overrides
    if let Ok(val) = std::env::var("FHIR_ETL_WORK_STUDIES_ROOT") {
        config.work.studies_root = val.into();
    }
    if let Ok(val) = std::env::var("FHIR_ETL_WORK_FILE_EXTENSION") {
        config.work.file_extension = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FHIR_ETL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FHIR_ETL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
