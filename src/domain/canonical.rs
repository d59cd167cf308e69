//! Canonical record format shared by the normalizer and the stores
//!
//! A canonical set is a directory holding one `{ResourceType}.ndjson` file per
//! resource type. Each line is a [`CanonicalRecord`].

use super::errors::EtlError;
use super::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Edge to another record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Target record id
    pub dst_id: String,
    /// Target node name, e.g. `patient`
    pub dst_name: String,
}

/// One record of a canonical set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Record id (the FHIR resource id)
    pub id: String,
    /// Node name, the snake-case resource type
    pub name: String,
    /// Outgoing references
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// The resource itself, plus `identifier_coding`
    pub object: Value,
}

impl CanonicalRecord {
    /// FHIR `resourceType` of the wrapped resource
    pub fn resource_type(&self) -> Option<&str> {
        self.object.get("resourceType").and_then(Value::as_str)
    }
}

/// Reads every non-blank line of an ndjson file as JSON
///
/// # Errors
///
/// Returns [`EtlError::Serialization`] naming the file and line of the first
/// invalid line.
pub fn read_ndjson(path: &Path) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                EtlError::Serialization(format!("{}:{}: {e}", path.display(), index + 1))
            })
        })
        .collect()
}

/// Reads the canonical records of one file
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is not a canonical record.
pub fn read_canonical_file(path: &Path) -> Result<Vec<CanonicalRecord>> {
    read_ndjson(path)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|e| {
                EtlError::Serialization(format!("{}: not a canonical record: {e}", path.display()))
            })
        })
        .collect()
}

/// `*.ndjson` files directly under `dir`, sorted by name
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn canonical_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "ndjson"))
        .collect();
    files.sort();
    Ok(files)
}

/// Every canonical record under `dir`, file by file
///
/// # Errors
///
/// Returns an error if any file cannot be read or parsed.
pub fn read_canonical_dir(dir: &Path) -> Result<Vec<CanonicalRecord>> {
    let mut records = Vec::new();
    for file in canonical_files(dir)? {
        records.extend(read_canonical_file(&file)?);
    }
    Ok(records)
}
