//! # Imagery Loader
//!
//! Batch loader for scanned aerial imagery. A run takes a folder of rasters in
//! assorted formats and coordinate systems and produces:
//!
//! - a reduced JPEG for every raster, mirrored under a versioned
//!   `<root>_Reduced_Images_v<N>` folder beside the source;
//! - one mosaic dataset per coordinate system, holding those JPEGs;
//! - a pipe-delimited audit log with one row per raster.
//!
//! # Pipeline
//!
//! ```text
//! 1. Enumerate   source/          →  raster paths           (scan)
//! 2. Classify    raster           →  staged / unreferenced  (classify, georef)
//! 3. Group       staged rasters   →  CRS groups             (group)
//! 4. Assemble    CRS group        →  mosaic + derivatives   (mosaic, reduce, metadata)
//! 5. Audit       every outcome    →  log_<stamp>.csv        (audit)
//! ```
//!
//! Rasters with no spatial reference are georeferenced from a point attribute
//! table when one is given: the image's name selects a row, whose flight
//! direction and scale pick a calibration that becomes a world file. Rasters
//! that stay unreferenced are still reduced, but logged as failures.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`process`] | Drives one load run end to end |
//! | [`scan`] | Lazy enumeration of rasters under the source folder |
//! | [`classify`] | Routes each raster by its native CRS |
//! | [`georef`] | Attribute tables, calibration lookup, world files |
//! | [`reduce`] | Versioned derivative folder and JPEG conversion |
//! | [`group`] | Partitions staged rasters by CRS name |
//! | [`mosaic`] | One mosaic dataset per CRS group |
//! | [`catalog`] | The `;`-delimited metadata CSV |
//! | [`metadata`] | Writing catalog rows onto rasters, HTML wrapper stripping |
//! | [`audit`] | The per-raster audit log |
//! | [`listing`] | `NoMetadataImages` listing of rasters with incomplete metadata |
//! | [`engine`] | Collaborator traits and their pure-Rust implementations |
//! | [`config`] | `loader.toml` loading, validation and merging |
//! | [`naming`] | Stamped and versioned file names |
//! | [`size`] | Human-readable raster sizes |
//! | [`output`] | CLI summaries |
//!
//! # Collaborators
//!
//! Raster I/O, the metadata store and the mosaic container sit behind the
//! traits in [`engine`]. The pipeline only ever sees [`engine::Backends`], so
//! the production implementations (a JPEG encoder with `.jgw`/`.prj` sidecars,
//! JSON metadata sidecars, and a directory-backed geodatabase) can be swapped
//! for a recording mock in tests.

pub mod audit;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod engine;
pub mod georef;
pub mod group;
pub mod listing;
pub mod metadata;
pub mod mosaic;
pub mod naming;
pub mod output;
pub mod process;
pub mod reduce;
pub mod scan;
pub mod size;

#[cfg(test)]
pub(crate) mod test_helpers;
