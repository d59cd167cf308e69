//! Dataset normalization
//!
//! - [`normalizer`] converts raw study files into a canonical set
//! - [`denormalize`] flattens canonical records into flat index documents

pub mod denormalize;
pub mod normalizer;

pub use denormalize::{denormalize_file, flatten_object};
pub use normalizer::{CanonicalSet, Normalizer, EXTRACTIONS_DIR};
