//! Validate config command implementation
//!
//! Loads the configuration the way a job would (file, then environment
//! overrides) and prints a summary. Secrets are never printed.

use crate::config::load_config_or_default;
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        if Path::new(config_path).exists() {
            println!("🔍 Validating configuration file: {config_path}");
        } else {
            println!("🔍 {config_path} not found, validating defaults and environment");
        }
        println!();

        let config = match load_config_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        let (schema, schema_is_default) = match config.dictionary.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Commons Endpoint: {}", config.commons.endpoint);
        println!(
            "  Access Token: {}",
            if config.commons.access_token.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("  Elasticsearch: {}", config.elastic.url);
        println!("  Index Prefix: {}", config.elastic.index_prefix);
        println!("  FHIR Index: {}", config.elastic.fhir_index);
        println!(
            "  Dictionary: {}{}",
            schema,
            if schema_is_default { " (default)" } else { "" }
        );
        println!("  Studies Root: {}", config.work.studies_root.display());
        println!("  Dataset Extension: {}", config.work.file_extension);
        println!();
        Ok(0)
    }
}
