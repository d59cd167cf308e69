//! Result type alias
//!
//! This module provides a convenient Result type alias that uses [`EtlError`]
//! as the error type.

use super::errors::EtlError;

/// Result type alias for ETL operations
///
/// # Examples
///
/// ```
/// use fhir_etl::domain::result::Result;
/// use fhir_etl::domain::errors::EtlError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(EtlError::MalformedRequest("project_id missing".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, EtlError>;
