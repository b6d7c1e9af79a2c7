//! Per-image CRS classification.
//!
//! ```text
//! describe ──► Known(name) ─────────────────────────────► Staged(name)
//!          ├─► Unknown ─┬─ georeferencing on ─► resolve ─┬─ ok ──► define 3857 ──► Staged(Web Mercator)
//!          │            │                                └─ err ─► Unreferenced(reason)
//!          │            └─ georeferencing off ─────────────────► Unreferenced("Downsized but not georeferenced")
//!          └─► error ──────────────────────────────────────────► Failed(message)
//! ```

use crate::engine::{Backends, CrsStatus, SpatialReference};
use crate::georef::GeoreferenceResolver;
use crate::group::StagedImage;
use std::path::{Path, PathBuf};

pub const NOT_GEOREFERENCED: &str = "Downsized but not georeferenced";

/// Where an enumerated image goes next.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Has a CRS and joins a mosaic.
    Staged(StagedImage),
    /// No CRS; still gets a derivative, but is logged as failed.
    Unreferenced { path: PathBuf, reason: String },
    /// Could not be inspected or georeferenced at all.
    Failed { path: PathBuf, error: String },
}

pub struct CrsClassifier<'a> {
    backends: Backends<'a>,
    resolver: Option<&'a GeoreferenceResolver>,
}

impl<'a> CrsClassifier<'a> {
    /// `resolver` is `None` when georeferencing is disabled.
    pub fn new(backends: Backends<'a>, resolver: Option<&'a GeoreferenceResolver>) -> Self {
        Self { backends, resolver }
    }

    pub fn classify(&self, path: &Path) -> Disposition {
        let status = match self.backends.raster.describe(path) {
            Ok(status) => status,
            Err(e) => {
                return Disposition::Failed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                };
            }
        };

        match status {
            CrsStatus::Known(crs) => Disposition::Staged(StagedImage {
                path: path.to_path_buf(),
                crs,
            }),
            CrsStatus::Unknown => match self.resolver {
                None => Disposition::Unreferenced {
                    path: path.to_path_buf(),
                    reason: NOT_GEOREFERENCED.to_string(),
                },
                Some(resolver) => self.georeference(resolver, path),
            },
        }
    }

    fn georeference(&self, resolver: &GeoreferenceResolver, path: &Path) -> Disposition {
        if let Err(failure) = resolver.resolve(path) {
            return Disposition::Unreferenced {
                path: path.to_path_buf(),
                reason: failure.to_string(),
            };
        }
        let sr = SpatialReference::web_mercator();
        match self.backends.raster.define_projection(path, &sr) {
            Ok(()) => Disposition::Staged(StagedImage {
                path: path.to_path_buf(),
                crs: sr.name,
            }),
            Err(e) => Disposition::Failed {
                path: path.to_path_buf(),
                error: e.to_string(),
            },
        }
    }
}
