//! Flattening of canonical records for the flat patient index
//!
//! Nested keys are joined with `_`: `{"name": [{"family": "Doe"}]}` becomes
//! `{"name_0_family": "Doe"}`. Arrays of scalars are kept as arrays.

use crate::domain::canonical::read_canonical_file;
use crate::domain::Result;
use serde_json::{Map, Value};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flattens a JSON object into `a_b_c` keys
pub fn flatten_object(value: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    if let Value::Object(map) = value {
        for (key, child) in map {
            flatten_into(key, child, &mut fields);
        }
    }
    fields
}

fn flatten_into(prefix: &str, value: &Value, fields: &mut Map<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{prefix}_{key}"), child, fields);
            }
        }
        Value::Array(items) if items.iter().any(|i| i.is_object() || i.is_array()) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}_{index}"), item, fields);
            }
        }
        _ => {
            fields.insert(prefix.to_string(), value.clone());
        }
    }
}

/// Writes one flat document per canonical record of `source` into `destination`
///
/// Each document is the flattened resource with the record `id`. Returns the
/// number of documents written.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the destination written.
pub fn denormalize_file(source: &Path, destination: &Path) -> Result<usize> {
    let records = read_canonical_file(source)?;
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(std::fs::File::create(destination)?);
    for record in &records {
        let mut document = flatten_object(&record.object);
        document.insert("id".to_string(), Value::from(record.id.clone()));
        serde_json::to_writer(&mut out, &document)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(records.len())
}
