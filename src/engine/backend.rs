//! Collaborator traits and shared types.
//!
//! The loader drives three external services, each behind its own trait:
//!
//! | Trait | Operations | Production implementation |
//! |---|---|---|
//! | [`RasterEngine`] | describe, define projection, copy to JPEG, extent | [`RustEngine`](super::rust_engine::RustEngine) |
//! | [`MetadataStore`] | read, read-only check, write | [`SidecarMetadataStore`](super::sidecar_store::SidecarMetadataStore) |
//! | [`MosaicStore`] | create workspace, create mosaic, add raster | [`FileGeodatabase`](super::geodatabase::FileGeodatabase) |
//!
//! Every call blocks until the service has finished. The pipeline never holds
//! more than one call in flight, so none of the traits require `Sync`.

use super::params::{CopyParams, MosaicDefinition};
use super::spatial_ref::SpatialReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Native spatial reference of a raster as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrsStatus {
    Known(String),
    Unknown,
}

impl CrsStatus {
    /// Display name, `"Unknown"` for rasters without a spatial reference.
    pub fn name(&self) -> &str {
        match self {
            CrsStatus::Known(name) => name,
            CrsStatus::Unknown => "Unknown",
        }
    }
}

/// Ground extent of a raster in its own CRS (pixel grid when unreferenced).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Descriptive metadata attached to a raster.
///
/// `access_constraints` holds what the metadata CSV calls "Use limitations".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterMetadata {
    pub title: Option<String>,
    pub tags: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub credits: Option<String>,
    pub access_constraints: Option<String>,
    pub extent: Option<String>,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
}

/// Raster describe/convert service.
pub trait RasterEngine {
    /// Native spatial reference of the raster.
    fn describe(&self, path: &Path) -> Result<CrsStatus, EngineError>;

    /// Assign a spatial reference to a raster without touching its pixels.
    fn define_projection(&self, path: &Path, sr: &SpatialReference) -> Result<(), EngineError>;

    /// Convert a raster into a JPEG derivative, carrying its georeference.
    fn copy_raster(&self, params: &CopyParams) -> Result<(), EngineError>;

    /// Ground extent of the raster.
    fn extent(&self, path: &Path) -> Result<Extent, EngineError>;
}

/// Per-raster metadata store.
pub trait MetadataStore {
    /// Current metadata; empty when none has been written yet.
    fn read(&self, path: &Path) -> Result<RasterMetadata, EngineError>;

    fn is_read_only(&self, path: &Path) -> Result<bool, EngineError>;

    /// Replace the raster's metadata and persist it.
    fn write(&self, path: &Path, metadata: &RasterMetadata) -> Result<(), EngineError>;
}

/// Mosaic dataset container.
pub trait MosaicStore {
    /// Create the container under `parent` and return its path.
    fn create_workspace(&self, parent: &Path, name: &str) -> Result<PathBuf, EngineError>;

    /// Create an empty mosaic dataset and return its path.
    fn create_mosaic(
        &self,
        workspace: &Path,
        definition: &MosaicDefinition,
    ) -> Result<PathBuf, EngineError>;

    /// Append a raster to an existing mosaic dataset.
    fn add_raster(&self, mosaic: &Path, raster: &Path) -> Result<(), EngineError>;
}

/// The set of collaborators one run talks to.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub raster: &'a dyn RasterEngine,
    pub metadata: &'a dyn MetadataStore,
    pub mosaics: &'a dyn MosaicStore,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;

    /// Mock backend that records operations without touching real rasters.
    ///
    /// Behaviour is keyed by file name (not full path) so tests can configure
    /// it before the pipeline decides where derivatives go. `copy_raster`
    /// writes a small placeholder so size accounting has something to measure.
    #[derive(Default)]
    pub struct MockBackend {
        pub crs: Mutex<HashMap<String, CrsStatus>>,
        pub failing_describe: Mutex<HashSet<String>>,
        pub failing_copy: Mutex<HashSet<String>>,
        pub failing_add: Mutex<HashSet<String>>,
        pub failing_workspace: Mutex<bool>,
        pub metadata: Mutex<HashMap<PathBuf, RasterMetadata>>,
        pub read_only: Mutex<HashSet<PathBuf>>,
        pub mosaics: Mutex<BTreeMap<PathBuf, Vec<PathBuf>>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Describe(String),
        DefineProjection { path: String, crs: String },
        Copy { source: String, output: String, quality: u32 },
        Extent(String),
        ReadMetadata(String),
        WriteMetadata { path: String, title: Option<String> },
        CreateWorkspace(String),
        CreateMosaic { name: String, crs: String, band_count: u8 },
        AddRaster { mosaic: String, raster: String },
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_crs(self, file: &str, status: CrsStatus) -> Self {
            self.crs.lock().unwrap().insert(file.to_string(), status);
            self
        }

        pub fn failing_describe(self, file: &str) -> Self {
            self.failing_describe.lock().unwrap().insert(file.to_string());
            self
        }

        pub fn failing_copy(self, file: &str) -> Self {
            self.failing_copy.lock().unwrap().insert(file.to_string());
            self
        }

        pub fn failing_add(self, file: &str) -> Self {
            self.failing_add.lock().unwrap().insert(file.to_string());
            self
        }

        pub fn failing_workspace(self) -> Self {
            *self.failing_workspace.lock().unwrap() = true;
            self
        }

        pub fn with_read_only(self, path: &Path) -> Self {
            self.read_only.lock().unwrap().insert(path.to_path_buf());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn mosaic_contents(&self) -> BTreeMap<PathBuf, Vec<PathBuf>> {
            self.mosaics.lock().unwrap().clone()
        }

        pub fn metadata_of(&self, path: &Path) -> Option<RasterMetadata> {
            self.metadata.lock().unwrap().get(path).cloned()
        }

        pub fn backends(&self) -> Backends<'_> {
            Backends {
                raster: self,
                metadata: self,
                mosaics: self,
            }
        }

        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl RasterEngine for MockBackend {
        fn describe(&self, path: &Path) -> Result<CrsStatus, EngineError> {
            self.record(RecordedOp::Describe(path.to_string_lossy().to_string()));
            let name = file_name(path);
            if self.failing_describe.lock().unwrap().contains(&name) {
                return Err(EngineError::ProcessingFailed(format!(
                    "Cannot describe {name}"
                )));
            }
            Ok(self
                .crs
                .lock()
                .unwrap()
                .get(&name)
                .cloned()
                .unwrap_or(CrsStatus::Unknown))
        }

        fn define_projection(
            &self,
            path: &Path,
            sr: &SpatialReference,
        ) -> Result<(), EngineError> {
            self.record(RecordedOp::DefineProjection {
                path: path.to_string_lossy().to_string(),
                crs: sr.name.clone(),
            });
            self.crs
                .lock()
                .unwrap()
                .insert(file_name(path), CrsStatus::Known(sr.name.clone()));
            Ok(())
        }

        fn copy_raster(&self, params: &CopyParams) -> Result<(), EngineError> {
            self.record(RecordedOp::Copy {
                source: params.source.to_string_lossy().to_string(),
                output: params.output.to_string_lossy().to_string(),
                quality: params.quality.value(),
            });
            let name = file_name(&params.source);
            if self.failing_copy.lock().unwrap().contains(&name) {
                return Err(EngineError::ProcessingFailed(format!(
                    "Cannot convert {name}"
                )));
            }
            std::fs::write(&params.output, b"jpeg")?;
            Ok(())
        }

        fn extent(&self, path: &Path) -> Result<Extent, EngineError> {
            self.record(RecordedOp::Extent(path.to_string_lossy().to_string()));
            Ok(Extent {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 10.0,
                ymax: 10.0,
            })
        }
    }

    impl MetadataStore for MockBackend {
        fn read(&self, path: &Path) -> Result<RasterMetadata, EngineError> {
            self.record(RecordedOp::ReadMetadata(path.to_string_lossy().to_string()));
            Ok(self.metadata_of(path).unwrap_or_default())
        }

        fn is_read_only(&self, path: &Path) -> Result<bool, EngineError> {
            Ok(self.read_only.lock().unwrap().contains(path))
        }

        fn write(&self, path: &Path, metadata: &RasterMetadata) -> Result<(), EngineError> {
            self.record(RecordedOp::WriteMetadata {
                path: path.to_string_lossy().to_string(),
                title: metadata.title.clone(),
            });
            self.metadata
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), metadata.clone());
            Ok(())
        }
    }

    impl MosaicStore for MockBackend {
        fn create_workspace(&self, parent: &Path, name: &str) -> Result<PathBuf, EngineError> {
            self.record(RecordedOp::CreateWorkspace(name.to_string()));
            if *self.failing_workspace.lock().unwrap() {
                return Err(EngineError::ProcessingFailed(
                    "Workspace is locked".to_string(),
                ));
            }
            Ok(parent.join(name))
        }

        fn create_mosaic(
            &self,
            workspace: &Path,
            definition: &MosaicDefinition,
        ) -> Result<PathBuf, EngineError> {
            self.record(RecordedOp::CreateMosaic {
                name: definition.name.clone(),
                crs: definition.crs.clone(),
                band_count: definition.band_count,
            });
            let path = workspace.join(&definition.name);
            self.mosaics.lock().unwrap().insert(path.clone(), Vec::new());
            Ok(path)
        }

        fn add_raster(&self, mosaic: &Path, raster: &Path) -> Result<(), EngineError> {
            self.record(RecordedOp::AddRaster {
                mosaic: mosaic.to_string_lossy().to_string(),
                raster: raster.to_string_lossy().to_string(),
            });
            let name = file_name(raster);
            if self.failing_add.lock().unwrap().contains(&name) {
                return Err(EngineError::ProcessingFailed(format!(
                    "Cannot add {name} to mosaic"
                )));
            }
            self.mosaics
                .lock()
                .unwrap()
                .get_mut(mosaic)
                .ok_or_else(|| EngineError::ProcessingFailed("No such mosaic".to_string()))?
                .push(raster.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn mock_reports_configured_crs() {
        let backend = MockBackend::new().with_crs("a.tif", CrsStatus::Known("NAD83".into()));

        assert_eq!(
            backend.describe(Path::new("/src/a.tif")).unwrap(),
            CrsStatus::Known("NAD83".into())
        );
        assert_eq!(
            backend.describe(Path::new("/src/b.tif")).unwrap(),
            CrsStatus::Unknown
        );

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Describe(p) if p == "/src/a.tif"));
    }

    #[test]
    fn mock_define_projection_changes_describe() {
        let backend = MockBackend::new();
        let path = Path::new("/src/a.tif");
        backend
            .define_projection(path, &SpatialReference::web_mercator())
            .unwrap();
        assert_eq!(
            backend.describe(path).unwrap().name(),
            "WGS 1984 Web Mercator (auxiliary sphere)"
        );
    }

    #[test]
    fn mock_metadata_round_trip() {
        let backend = MockBackend::new();
        let path = Path::new("/src/a.tif");
        let md = RasterMetadata {
            title: Some("Flight 7".into()),
            ..Default::default()
        };
        backend.write(path, &md).unwrap();
        assert_eq!(backend.read(path).unwrap(), md);
    }

    #[test]
    fn crs_status_names() {
        assert_eq!(CrsStatus::Unknown.name(), "Unknown");
        assert_eq!(CrsStatus::Known("NAD83".into()).name(), "NAD83");
    }

    #[test]
    fn extent_display() {
        let e = Extent {
            xmin: 98400.0,
            ymin: 201000.0,
            xmax: 98410.5,
            ymax: 201600.0,
        };
        assert_eq!(e.to_string(), "98400 201000 98410.5 201600");
    }
}
