//! Reduced JPEG derivatives.
//!
//! Every derivative mirrors its source's position under the source folder,
//! beneath a versioned sibling root chosen once per run:
//!
//! ```text
//! surveys/
//! ├── county-1987/
//! │   └── 1987/flight-3/f3_0042.tif
//! └── county-1987_Reduced_Images_v2/
//!     └── 1987/flight-3/f3_0042.jpg      # + .jgw / .prj when georeferenced
//! ```
//!
//! Directories are created on demand, so a run that converts nothing leaves no
//! empty root behind.

use crate::engine::{Backends, CopyParams, EngineError, PixelType, Quality};
use crate::naming::{next_version, reduced_folder_name};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ReducedImageFactory {
    source_root: PathBuf,
    reduced_root: PathBuf,
    quality: Quality,
}

impl ReducedImageFactory {
    /// Pick the next free `<root>_Reduced_Images_v<N>` beside `source_root`.
    pub fn prepare(source_root: &Path, quality: Quality) -> io::Result<Self> {
        let (Some(parent), Some(root_name)) = (
            source_root.parent(),
            source_root.file_name().and_then(|n| n.to_str()),
        ) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no parent folder", source_root.display()),
            ));
        };

        let mut siblings = Vec::new();
        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                siblings.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        let version = next_version(root_name, &siblings);
        let reduced_root = parent.join(reduced_folder_name(root_name, version));
        log::debug!("Reduced images go to {}", reduced_root.display());

        Ok(Self {
            source_root: source_root.to_path_buf(),
            reduced_root,
            quality,
        })
    }

    pub fn reduced_root(&self) -> &Path {
        &self.reduced_root
    }

    /// Target path for `source`, creating its directory.
    ///
    /// Sources outside the source root land directly under the reduced root.
    pub fn derive(&self, source: &Path) -> io::Result<PathBuf> {
        let relative_dir = source
            .strip_prefix(&self.source_root)
            .ok()
            .and_then(Path::parent)
            .unwrap_or(Path::new(""));
        let dir = self.reduced_root.join(relative_dir);
        std::fs::create_dir_all(&dir)?;

        let stem = source.file_stem().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", source.display()),
            )
        })?;
        let mut name = stem.to_os_string();
        name.push(".jpg");
        Ok(dir.join(name))
    }

    /// Derive the target path and convert `source` into it.
    pub fn convert(&self, backends: &Backends<'_>, source: &Path) -> Result<PathBuf, EngineError> {
        let output = self.derive(source)?;
        backends.raster.copy_raster(&CopyParams {
            source: source.to_path_buf(),
            output: output.clone(),
            pixel_type: PixelType::U8,
            quality: self.quality,
        })?;
        log::debug!("{} -> {}", source.display(), output.display());
        Ok(output)
    }
}
