//! Commit manifest
//!
//! A manifest is the `meta-index.ndjson` file the submission client stores with a
//! commit: one JSON object per line, each naming a record that was loaded at that
//! commit. It is only ever diffed against store contents.

use super::errors::EtlError;
use super::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// One manifest line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Record identifier
    pub id: String,

    /// Any other keys on the line, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ordered record identifiers recovered from a prior commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Creates a manifest from entries
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Creates a manifest holding only identifiers
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| ManifestEntry {
                    id: id.into(),
                    extra: Map::new(),
                })
                .collect(),
        )
    }

    /// Parses newline-delimited JSON; blank lines are ignored
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Serialization`] naming the first line that is not an
    /// object with a string `id`.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: ManifestEntry = serde_json::from_str(line).map_err(|e| {
                EtlError::Serialization(format!("manifest line {}: {e}", index + 1))
            })?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    /// Reads and parses a manifest file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Entries in file order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Distinct identifiers
    pub fn ids(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// Whether `id` was part of the commit
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers in `store_ids` that are not in the manifest
    pub fn missing_from<'a, I>(&self, store_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let keep = self.ids();
        store_ids
            .into_iter()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ndjson() {
        let contents = "{\"id\": \"p1\", \"resourceType\": \"Patient\"}\n\n{\"id\": \"o1\"}\n";
        let manifest = Manifest::parse(contents).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("p1"));
        assert_eq!(manifest.entries()[0].extra["resourceType"], "Patient");
    }

    #[test]
    fn test_parse_reports_bad_line() {
        let err = Manifest::parse("{\"id\": \"p1\"}\n{\"name\": \"x\"}\n").unwrap_err();
        assert!(err.to_string().contains("manifest line 2"));
    }

    #[test]
    fn test_missing_from() {
        let manifest = Manifest::from_ids(["a", "b"]);
        let store = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(manifest.missing_from(&store), vec!["c".to_string()]);
        assert!(Manifest::from_ids(["a", "b", "c"]).missing_from(&store).is_empty());
    }
}
