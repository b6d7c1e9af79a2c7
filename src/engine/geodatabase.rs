//! File-based mosaic dataset container.
//!
//! A workspace is a directory; each mosaic dataset inside it is a JSON
//! catalog listing the rasters added so far:
//!
//! ```text
//! scans_19102026_14h05min09.gdb/
//! ├── MosaicDataset_NAD83_1images.json
//! └── MosaicDataset_WGS_1984_Web_Mercator__auxiliary_sphere__2images.json
//! ```
//!
//! The catalog is rewritten after every addition, so a run that dies halfway
//! leaves a valid catalog of what was added up to that point.

use super::backend::{EngineError, MosaicStore};
use super::params::{MosaicDefinition, PixelType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk form of one mosaic dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MosaicCatalog {
    pub name: String,
    pub crs: String,
    pub band_count: u8,
    pub pixel_type: PixelType,
    pub rasters: Vec<PathBuf>,
}

impl MosaicCatalog {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FileGeodatabase;

impl FileGeodatabase {
    pub fn new() -> Self {
        Self
    }
}

impl MosaicStore for FileGeodatabase {
    fn create_workspace(&self, parent: &Path, name: &str) -> Result<PathBuf, EngineError> {
        let path = parent.join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    fn create_mosaic(
        &self,
        workspace: &Path,
        definition: &MosaicDefinition,
    ) -> Result<PathBuf, EngineError> {
        if !workspace.is_dir() {
            return Err(EngineError::ProcessingFailed(format!(
                "Workspace {} does not exist",
                workspace.display()
            )));
        }
        let path = workspace.join(format!("{}.json", definition.name));
        if path.exists() {
            return Err(EngineError::ProcessingFailed(format!(
                "Mosaic dataset {} already exists",
                definition.name
            )));
        }
        MosaicCatalog {
            name: definition.name.clone(),
            crs: definition.crs.clone(),
            band_count: definition.band_count,
            pixel_type: definition.pixel_type,
            rasters: Vec::new(),
        }
        .save(&path)?;
        Ok(path)
    }

    fn add_raster(&self, mosaic: &Path, raster: &Path) -> Result<(), EngineError> {
        if !raster.is_file() {
            return Err(EngineError::ProcessingFailed(format!(
                "Raster {} does not exist",
                raster.display()
            )));
        }
        let mut catalog = MosaicCatalog::load(mosaic)?;
        catalog.rasters.push(raster.to_path_buf());
        catalog.save(mosaic)
    }
}
