//! Raw study files to canonical records
//!
//! Every line of every dataset file under the raw directory is classified by its
//! `resourceType`. One `{ResourceType}.ndjson` file per type is written into the
//! `extractions/` subdirectory, which is rebuilt from scratch on every run.

use crate::domain::canonical::{CanonicalRecord, Relation};
use crate::domain::resource::{canonical_file_name, node_name};
use crate::domain::{EtlError, ResourceType, Result, SchemaRef};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the canonical subdirectory
pub const EXTRACTIONS_DIR: &str = "extractions";

/// Canonical files written by one normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalSet {
    dir: PathBuf,
    counts: BTreeMap<String, usize>,
    skipped: usize,
}

impl CanonicalSet {
    /// Directory holding the canonical files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical file of `resource_type`, if it has any records
    pub fn path_for(&self, resource_type: ResourceType) -> Option<PathBuf> {
        self.path_for_type(resource_type.as_str())
    }

    /// Canonical file of a type given by name, if it has any records
    pub fn path_for_type(&self, resource_type: &str) -> Option<PathBuf> {
        self.counts
            .contains_key(resource_type)
            .then(|| self.dir.join(canonical_file_name(resource_type)))
    }

    /// Records written for `resource_type`
    pub fn count(&self, resource_type: &str) -> usize {
        self.counts.get(resource_type).copied().unwrap_or(0)
    }

    /// Types present, sorted
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Total records written
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Lines that were not usable resources
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Converts raw study files to canonical sets
#[derive(Debug, Clone)]
pub struct Normalizer {
    file_extension: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new("ndjson")
    }
}

impl Normalizer {
    /// Normalizer reading files with `file_extension`
    pub fn new(file_extension: impl Into<String>) -> Self {
        Self {
            file_extension: file_extension.into(),
        }
    }

    /// Normalizes `raw_dir` into `raw_dir/extractions`
    ///
    /// When the same `(resourceType, id)` appears more than once the last one
    /// read wins. Files are read in path order.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Normalization`] if the raw directory cannot be read or
    /// the canonical files cannot be written.
    pub fn normalize(&self, raw_dir: &Path, schema: &SchemaRef) -> Result<CanonicalSet> {
        let extractions = raw_dir.join(EXTRACTIONS_DIR);
        if extractions.exists() {
            std::fs::remove_dir_all(&extractions).map_err(normalization_error)?;
        }

        let mut by_type: BTreeMap<String, BTreeMap<String, CanonicalRecord>> = BTreeMap::new();
        let mut skipped = 0;

        for file in self.dataset_files(raw_dir)? {
            let reader = BufReader::new(File::open(&file).map_err(normalization_error)?);
            for line in reader.lines() {
                let line = line.map_err(normalization_error)?;
                if line.trim().is_empty() {
                    continue;
                }
                match to_canonical(&line) {
                    Some((resource_type, record)) => {
                        by_type
                            .entry(resource_type)
                            .or_default()
                            .insert(record.id.clone(), record);
                    }
                    None => skipped += 1,
                }
            }
        }

        std::fs::create_dir_all(&extractions).map_err(normalization_error)?;
        let mut counts = BTreeMap::new();
        for (resource_type, records) in by_type {
            let path = extractions.join(canonical_file_name(&resource_type));
            let mut out = BufWriter::new(File::create(&path).map_err(normalization_error)?);
            for record in records.values() {
                serde_json::to_writer(&mut out, record)?;
                out.write_all(b"\n").map_err(normalization_error)?;
            }
            out.flush().map_err(normalization_error)?;
            counts.insert(resource_type, records.len());
        }

        tracing::info!(
            raw_dir = %raw_dir.display(),
            schema = %schema,
            types = counts.len(),
            skipped = skipped,
            "Normalized study"
        );

        Ok(CanonicalSet {
            dir: extractions,
            counts,
            skipped,
        })
    }

    fn dataset_files(&self, raw_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(raw_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != EXTRACTIONS_DIR);
        for entry in walker {
            let entry = entry.map_err(|e| EtlError::Normalization(e.to_string()))?;
            let matches = entry
                .path()
                .extension()
                .is_some_and(|ext| ext == self.file_extension.as_str());
            if entry.file_type().is_file() && matches {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

fn normalization_error(err: std::io::Error) -> EtlError {
    EtlError::Normalization(err.to_string())
}

/// Canonical record of one raw line, or `None` if the line is not a resource
fn to_canonical(line: &str) -> Option<(String, CanonicalRecord)> {
    let Value::Object(mut resource) = serde_json::from_str::<Value>(line).ok()? else {
        return None;
    };
    let resource_type = resource.get("resourceType")?.as_str()?.to_string();
    let id = resource.get("id")?.as_str()?.to_string();
    if resource_type.is_empty() || id.is_empty() {
        return None;
    }

    let mut relations = Vec::new();
    collect_references(&Value::Object(resource.clone()), &mut relations);

    let coding = identifier_coding(&resource);
    resource.insert("identifier_coding".to_string(), Value::from(coding));

    let record = CanonicalRecord {
        id,
        name: node_name(&resource_type),
        relations,
        object: Value::Object(resource),
    };
    Some((resource_type, record))
}

/// `Type/id` references anywhere in the resource
fn collect_references(value: &Value, relations: &mut Vec<Relation>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "reference" {
                    if let Some((dst_type, dst_id)) = child.as_str().and_then(|r| r.split_once('/')) {
                        if !dst_type.is_empty() && !dst_id.is_empty() && !dst_id.contains('/') {
                            let relation = Relation {
                                dst_id: dst_id.to_string(),
                                dst_name: node_name(dst_type),
                            };
                            if !relations.contains(&relation) {
                                relations.push(relation);
                            }
                        }
                    }
                } else {
                    collect_references(child, relations);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, relations)),
        _ => {}
    }
}

/// `system#value` for every identifier; string identifiers are kept as they are
fn identifier_coding(resource: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(identifiers)) = resource.get("identifier") else {
        return Vec::new();
    };
    identifiers
        .iter()
        .filter_map(|identifier| match identifier {
            Value::String(s) => Some(s.clone()),
            Value::Object(fields) => {
                let value = fields.get("value")?.as_str()?;
                let system = fields.get("system").and_then(Value::as_str).unwrap_or("");
                Some(format!("{system}#{value}"))
            }
            _ => None,
        })
        .collect()
}
