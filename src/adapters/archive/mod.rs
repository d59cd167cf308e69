//! Archive library: expands commit archives and packs snapshots

pub mod zip_archive;

pub use zip_archive::ZipArchiver;

use crate::domain::Result;
use std::path::{Path, PathBuf};

/// Archive format used for commits and snapshots
pub trait Archiver: Send + Sync {
    /// Expands `archive` into `target_dir`, dropping member directories
    ///
    /// Every member file lands directly under `target_dir`; a later member with
    /// the same file name overwrites an earlier one. Returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::EtlError::Expansion`] if the archive is corrupt or
    /// unsupported.
    fn expand(&self, archive: &Path, target_dir: &Path) -> Result<Vec<PathBuf>>;

    /// Packs every file under `source_dir` into `archive`, keeping relative paths
    ///
    /// Returns the number of files packed.
    fn create(&self, source_dir: &Path, archive: &Path) -> Result<usize>;
}
