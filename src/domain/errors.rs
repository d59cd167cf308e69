//! Domain error types
//!
//! This module defines the error hierarchy for the ETL job. Only
//! [`EtlError::MalformedRequest`] and [`EtlError::UnknownMethod`] are fatal to a job;
//! every other variant is caught by the stage that produced it and recorded in the
//! job log. Errors are domain-specific and don't expose third-party types.

use std::fmt;
use thiserror::Error;

/// Main ETL error type
#[derive(Debug, Error)]
pub enum EtlError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The job description is missing required fields or has invalid values
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The job description names a method other than put, get or delete
    #[error("unknown method {0}")]
    UnknownMethod(String),

    /// The actor lacks the grants required for an operation
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Identity service or token problems
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The object store could not deliver an object
    #[error("Download error: {0}")]
    Download(String),

    /// A downloaded archive could not be expanded
    #[error("Expansion error: {0}")]
    Expansion(String),

    /// Raw study files could not be converted to the canonical layout
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Errors raised by one of the derived stores
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl EtlError {
    /// Whether this error must terminate the whole job
    pub fn is_fatal(&self) -> bool {
        matches!(self, EtlError::MalformedRequest(_) | EtlError::UnknownMethod(_))
    }
}

/// Collaborator that raised a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKind {
    /// Identity/authorization service
    Identity,
    /// Object storage (buckets)
    ObjectStore,
    /// Graph metadata store
    Graph,
    /// Flat/search index
    Search,
    /// FHIR document store
    Documents,
    /// Discovery summary store
    Discovery,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::Identity => "identity service",
            StoreKind::ObjectStore => "object store",
            StoreKind::Graph => "graph store",
            StoreKind::Search => "search index",
            StoreKind::Documents => "document store",
            StoreKind::Discovery => "discovery store",
        };
        f.write_str(name)
    }
}

/// Store-specific errors
///
/// Errors that occur when talking to the graph, search, document, discovery or
/// object stores. HTTP client types are flattened into messages.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to reach the store
    #[error("Failed to connect to {store}: {message}")]
    Connection { store: StoreKind, message: String },

    /// A write (load, put, publish, delete) was rejected
    #[error("{store} write failed: {message}")]
    WriteFailed { store: StoreKind, message: String },

    /// A read (get, count, search) was rejected
    #[error("{store} read failed: {message}")]
    ReadFailed { store: StoreKind, message: String },

    /// The store answered with a status the client does not handle
    #[error("{store} returned status {status}: {message}")]
    UnexpectedStatus {
        store: StoreKind,
        status: u16,
        message: String,
    },
}

impl StoreError {
    /// Store that produced the error
    pub fn store(&self) -> StoreKind {
        match self {
            StoreError::Connection { store, .. }
            | StoreError::WriteFailed { store, .. }
            | StoreError::ReadFailed { store, .. }
            | StoreError::UnexpectedStatus { store, .. } => *store,
        }
    }

    /// Shorthand for a write failure
    pub fn write(store: StoreKind, message: impl Into<String>) -> Self {
        StoreError::WriteFailed {
            store,
            message: message.into(),
        }
    }

    /// Shorthand for a read failure
    pub fn read(store: StoreKind, message: impl Into<String>) -> Self {
        StoreError::ReadFailed {
            store,
            message: message.into(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from walkdir errors raised while scanning study directories
impl From<walkdir::Error> for EtlError {
    fn from(err: walkdir::Error) -> Self {
        EtlError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etl_error_display() {
        let err = EtlError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_unknown_method_display() {
        let err = EtlError::UnknownMethod("patch".to_string());
        assert_eq!(err.to_string(), "unknown method patch");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(EtlError::MalformedRequest("x".into()).is_fatal());
        assert!(EtlError::UnknownMethod("x".into()).is_fatal());
        assert!(!EtlError::Download("x".into()).is_fatal());
        assert!(!EtlError::AuthorizationDenied("x".into()).is_fatal());
        assert!(!EtlError::Store(StoreError::write(StoreKind::Graph, "x")).is_fatal());
    }

    #[test]
    fn test_store_error_conversion() {
        let store_err = StoreError::write(StoreKind::Search, "bulk rejected");
        assert_eq!(store_err.store(), StoreKind::Search);
        let etl_err: EtlError = store_err.into();
        assert!(matches!(etl_err, EtlError::Store(_)));
        assert_eq!(
            etl_err.to_string(),
            "Store error: search index write failed: bulk rejected"
        );
    }

    #[test]
    fn test_unexpected_status_display() {
        let err = StoreError::UnexpectedStatus {
            store: StoreKind::Discovery,
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "discovery store returned status 503: unavailable"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let etl_err: EtlError = io_err.into();
        assert!(matches!(etl_err, EtlError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let etl_err: EtlError = json_err.into();
        assert!(matches!(etl_err, EtlError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let etl_err: EtlError = toml_err.into();
        assert!(matches!(etl_err, EtlError::Configuration(_)));
        assert!(etl_err.to_string().contains("TOML parse error"));
    }
}
