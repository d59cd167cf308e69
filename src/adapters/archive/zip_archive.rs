//! Zip archives

use super::Archiver;
use crate::domain::{EtlError, Result};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// [`Archiver`] for zip files
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Creates an archiver
    pub fn new() -> Self {
        Self
    }
}

impl Archiver for ZipArchiver {
    fn expand(&self, archive: &Path, target_dir: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(archive)
            .map_err(|e| EtlError::Expansion(format!("{}: {e}", archive.display())))?;
        let mut zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| EtlError::Expansion(format!("{}: {e}", archive.display())))?;
        fs::create_dir_all(target_dir)?;

        let mut written = BTreeSet::new();
        for i in 0..zip.len() {
            let mut member = zip
                .by_index(i)
                .map_err(|e| EtlError::Expansion(format!("entry {i}: {e}")))?;
            if member.is_dir() {
                continue;
            }
            let Some(file_name) = member
                .enclosed_name()
                .and_then(|name| name.file_name().map(|n| n.to_os_string()))
            else {
                tracing::warn!(entry = member.name(), "Skipping archive entry with unsafe path");
                continue;
            };

            let out_path = target_dir.join(file_name);
            let mut out = File::create(&out_path)?;
            io::copy(&mut member, &mut out)
                .map_err(|e| EtlError::Expansion(format!("{}: {e}", member.name())))?;
            written.insert(out_path);
        }

        Ok(written.into_iter().collect())
    }

    fn create(&self, source_dir: &Path, archive: &Path) -> Result<usize> {
        if let Some(parent) = archive.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut zip = ZipWriter::new(BufWriter::new(File::create(archive)?));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut packed = 0;
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.path() == archive {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| EtlError::Io(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            zip.start_file(name, options)
                .map_err(|e| EtlError::Io(format!("zip: {e}")))?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
            packed += 1;
        }

        zip.finish().map_err(|e| EtlError::Io(format!("zip: {e}")))?;
        Ok(packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in members {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_expand_flattens_directories() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("commit.zip");
        write_zip(
            &archive,
            &[
                ("META/Patient.ndjson", "{}"),
                ("nested/deeper/Observation.ndjson", "{}"),
            ],
        );

        let target = dir.path().join("out");
        let paths = ZipArchiver::new().expand(&archive, &target).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(target.join("Patient.ndjson").exists());
        assert!(target.join("Observation.ndjson").exists());
        assert!(!target.join("META").exists());
    }

    #[test]
    fn test_expand_later_member_overwrites() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("commit.zip");
        write_zip(&archive, &[("a/x.ndjson", "first"), ("b/x.ndjson", "second")]);

        let target = dir.path().join("out");
        let paths = ZipArchiver::new().expand(&archive, &target).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(fs::read_to_string(target.join("x.ndjson")).unwrap(), "second");
    }

    #[test]
    fn test_expand_rejects_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip").unwrap();
        let err = ZipArchiver::new()
            .expand(&archive, &dir.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, EtlError::Expansion(_)));
    }

    #[test]
    fn test_create_then_expand() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tree");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("Patient.ndjson"), "p").unwrap();
        fs::write(source.join("sub").join("Observation.ndjson"), "o").unwrap();

        let archive = dir.path().join("snap.zip");
        assert_eq!(ZipArchiver::new().create(&source, &archive).unwrap(), 2);

        let zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<&str> = zip.file_names().collect();
        assert!(names.contains(&"sub/Observation.ndjson"));
        assert!(names.contains(&"Patient.ndjson"));
    }
}
