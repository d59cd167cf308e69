//! Manifest reconciliation
//!
//! Empties a project, or rolls it back to the records named by a commit manifest.

pub mod reconciler;

pub use reconciler::{ReconcileReport, Reconciler, Scope};
