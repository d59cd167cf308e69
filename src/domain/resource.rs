//! FHIR resource types the loader knows about

use std::fmt;

/// Resource types with a dedicated place in the derived stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// Patient, indexed (denormalized) in the `patient` flat index
    Patient,
    /// Observation, indexed in the `observation` flat index
    Observation,
    /// DocumentReference, indexed in the `file` flat index
    DocumentReference,
    /// ResearchStudy, feeds the discovery summary
    ResearchStudy,
}

impl ResourceType {
    /// Types backed by a flat index, in load order
    pub const INDEXED: [ResourceType; 3] = [
        ResourceType::Patient,
        ResourceType::Observation,
        ResourceType::DocumentReference,
    ];

    /// FHIR `resourceType` value
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Observation => "Observation",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::ResearchStudy => "ResearchStudy",
        }
    }

    /// Flat index name, if the type has one
    pub fn index_name(&self) -> Option<&'static str> {
        match self {
            ResourceType::Patient => Some("patient"),
            ResourceType::Observation => Some("observation"),
            ResourceType::DocumentReference => Some("file"),
            ResourceType::ResearchStudy => None,
        }
    }

    /// Canonical extraction file name
    pub fn file_name(&self) -> String {
        canonical_file_name(self.as_str())
    }

    /// Every flat index name
    pub fn index_names() -> impl Iterator<Item = &'static str> {
        Self::INDEXED.iter().filter_map(|t| t.index_name())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ResourceType}.ndjson`
pub fn canonical_file_name(resource_type: &str) -> String {
    format!("{resource_type}.ndjson")
}

/// Graph node name of a resource type: `DocumentReference` -> `document_reference`
pub fn node_name(resource_type: &str) -> String {
    let mut name = String::with_capacity(resource_type.len() + 4);
    for (i, c) in resource_type.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}
