//! Raster engine, metadata store and mosaic container.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Describe** | `.prj` WKT name, GeoTIFF keys via `crs-definitions` |
//! | **Copy → JPEG** | `image` decoders + `JpegEncoder`, `rayon` bit-depth stretch |
//! | **Extent** | world file or GeoTIFF tie point, pixel grid fallback |
//! | **Metadata** | JSON sidecar (`serde_json`) |
//! | **Mosaics** | directory workspace with one JSON catalog per mosaic |
//!
//! The module is split into:
//! - **Parameters**: what to convert and what mosaic to create
//! - **Spatial references**: CRS names and WKT
//! - **Backend**: collaborator traits, shared types, [`EngineError`]
//! - **Implementations**: [`RustEngine`], [`SidecarMetadataStore`], [`FileGeodatabase`]

pub mod backend;
pub mod geodatabase;
pub(crate) mod geotiff;
pub mod params;
pub mod rust_engine;
pub mod sidecar_store;
pub mod spatial_ref;

pub use backend::{
    Backends, CrsStatus, EngineError, Extent, MetadataStore, MosaicStore, RasterEngine,
    RasterMetadata,
};
pub use geodatabase::FileGeodatabase;
pub use params::{CopyParams, MosaicDefinition, PixelType, Quality};
pub use rust_engine::RustEngine;
pub use sidecar_store::SidecarMetadataStore;
pub use spatial_ref::SpatialReference;
