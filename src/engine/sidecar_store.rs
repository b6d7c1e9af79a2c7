//! Raster metadata kept in a JSON sidecar next to each raster.
//!
//! ```text
//! 1987/
//! ├── flight-3_0042.tif
//! └── flight-3_0042.tif.metadata.json
//! ```
//!
//! The sidecar name keeps the raster's full file name so `a.tif` and `a.jpg`
//! in the same folder never share metadata.

use super::backend::{EngineError, MetadataStore, RasterMetadata};
use std::path::{Path, PathBuf};

const SIDECAR_SUFFIX: &str = ".metadata.json";

#[derive(Debug, Default)]
pub struct SidecarMetadataStore;

impl SidecarMetadataStore {
    pub fn new() -> Self {
        Self
    }

    pub fn sidecar_path(raster: &Path) -> PathBuf {
        let mut name = raster.file_name().unwrap_or_default().to_os_string();
        name.push(SIDECAR_SUFFIX);
        raster.with_file_name(name)
    }
}

impl MetadataStore for SidecarMetadataStore {
    fn read(&self, path: &Path) -> Result<RasterMetadata, EngineError> {
        let sidecar = Self::sidecar_path(path);
        if !sidecar.exists() {
            return Ok(RasterMetadata::default());
        }
        let content = std::fs::read_to_string(&sidecar)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read-only when the sidecar is, or when it doesn't exist yet and the
    /// folder can't take a new file.
    fn is_read_only(&self, path: &Path) -> Result<bool, EngineError> {
        let sidecar = Self::sidecar_path(path);
        let probe = if sidecar.exists() {
            sidecar
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        Ok(std::fs::metadata(&probe)?.permissions().readonly())
    }

    fn write(&self, path: &Path, metadata: &RasterMetadata) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(metadata)?;
        std::fs::write(Self::sidecar_path(path), json)?;
        Ok(())
    }
}
