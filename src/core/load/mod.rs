//! Multi-store loading of canonical sets

pub mod loader;

pub use loader::{LoadOptions, LoadReport, Loader};
