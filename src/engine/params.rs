//! Parameter types for engine operations.
//!
//! These structs describe *what* to do, not *how* to do it. They sit between
//! the pipeline (which decides what derivatives and mosaics to create) and the
//! [`backend`](super::backend) traits (which do the actual raster work), so a
//! mock backend can stand in for the real engine without changing pipeline
//! logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 75), clamped on construction.
//! - [`PixelType`]: output pixel depth. Derivatives are always 8-bit unsigned.
//! - [`CopyParams`]: source, output path, pixel type and quality for a raster copy.
//! - [`MosaicDefinition`]: name, CRS, band count and pixel type for a new mosaic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Quality setting for lossy JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Pixel depth of a derivative or mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelType {
    #[default]
    #[serde(rename = "8_BIT_UNSIGNED")]
    U8,
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelType::U8 => f.write_str("8_BIT_UNSIGNED"),
        }
    }
}

/// Parameters for converting a source raster into a JPEG derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub pixel_type: PixelType,
    pub quality: Quality,
}

/// Band count of every mosaic the loader creates (RGB).
pub const MOSAIC_BAND_COUNT: u8 = 3;

/// Parameters for creating a mosaic dataset inside a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicDefinition {
    pub name: String,
    /// Display name of the CRS shared by every raster in the mosaic.
    pub crs: String,
    pub band_count: u8,
    pub pixel_type: PixelType,
}

impl MosaicDefinition {
    /// An RGB, 8-bit mosaic for the given CRS.
    pub fn rgb(name: impl Into<String>, crs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: crs.into(),
            band_count: MOSAIC_BAND_COUNT,
            pixel_type: PixelType::U8,
        }
    }
}
