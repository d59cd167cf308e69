//! Configuration management.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `FHIR_ETL_*` overrides and
//! validation on load. Every setting has a default, so a job container can be
//! configured from the environment alone.
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [commons]
//! endpoint = "https://commons.example.org"
//! access_token = "${ACCESS_TOKEN}"
//!
//! [elastic]
//! url = "http://esproxy-service:9200"
//! index_prefix = "gen3.aced.io"
//!
//! [dictionary]
//! url = "https://aced-public.s3.us-west-2.amazonaws.com/aced-test.json"
//!
//! [work]
//! studies_root = "/root/studies"
//! ```
//!
//! ```rust,no_run
//! use fhir_etl::config::load_config_or_default;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config_or_default("fhir-etl.toml")?;
//! println!("Commons: {}", config.commons.endpoint);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_or_default, ACCESS_TOKEN_VAR, DICTIONARY_URL_VAR};
pub use schema::{
    ApplicationConfig, CommonsConfig, DictionaryConfig, ElasticConfig, EtlConfig, LoggingConfig,
    RetryConfig, WorkConfig, DEFAULT_DICTIONARY_URL,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
