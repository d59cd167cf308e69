//! Archive materialization
//!
//! Turns a commit object in the bucket into files on local disk: the object is
//! downloaded into the project's staging directory and expanded, flattened, into
//! the commit working area.

pub mod materializer;
pub mod working_area;

pub use materializer::{ExpandedPaths, Materializer};
pub use working_area::WorkingArea;
