//! Snapshot export
//!
//! Packs everything the document store holds for a project into a zip archive and
//! uploads it to the bucket as a snapshot object.

pub mod checksum;
pub mod snapshot;

pub use checksum::{checksum_bytes, checksum_file};
pub use snapshot::{snapshot_file_name, ExportReport, SnapshotExporter};
