//! Synthetic georeferencing for scans with no spatial reference.
//!
//! - **Table**: point attribute table loaded from a shapefile or CSV
//! - **World files**: six-parameter transform, calibration table, sidecar naming
//! - **Resolver**: table row → world file, with a fixed set of failure reasons

pub mod resolver;
pub(crate) mod shapefile;
pub mod table;
pub mod worldfile;

pub use resolver::{GeoreferenceFailure, GeoreferenceFields, GeoreferenceResolver};
pub use table::{AttributeTable, TableError};
pub use worldfile::WorldFile;
