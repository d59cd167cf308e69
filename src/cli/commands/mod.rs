//! CLI command implementations
//!
//! Commands return the process exit code: 0 ok, 1 identity failure, 2 malformed
//! input or bad configuration, 5 fatal.

pub mod load_study;
pub mod run;
pub mod validate;
