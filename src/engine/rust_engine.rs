//! Pure Rust raster engine.
//!
//! Everything is statically linked into the binary; no GIS installation is
//! needed at run time.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, BMP, GIF) | `image` crate (pure Rust decoders) |
//! | 16-bit / float → 8-bit | linear min/max stretch, parallelized with `rayon` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | CRS from `.prj` | WKT root name ([`spatial_ref`](super::spatial_ref)) |
//! | CRS from GeoTIFF keys | custom [`geotiff`](super::geotiff) reader + `crs-definitions` |
//! | Georeference | world file sidecar, else GeoTIFF tie point + pixel scale |
//!
//! Formats the decoders don't cover (JPEG 2000, ERDAS IMG, CRF, BIP) can still
//! be described and georeferenced, but converting them fails with
//! [`EngineError::UnsupportedFormat`].

use super::backend::{CrsStatus, EngineError, Extent, RasterEngine};
use super::geotiff::{GeoTiffInfo, read_geotiff};
use super::params::{CopyParams, PixelType};
use super::spatial_ref::SpatialReference;
use crate::georef::worldfile::{WorldFile, world_file_path};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageReader, RgbImage};
use rayon::prelude::*;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Pure Rust engine using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustEngine;

impl RustEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

fn prj_path(raster: &Path) -> PathBuf {
    raster.with_extension("prj")
}

/// World file sidecars a raster may carry, most specific first.
fn world_file_candidates(raster: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![world_file_path(raster)];
    if let Some(ext) = raster.extension().and_then(|e| e.to_str()) {
        candidates.push(raster.with_extension(format!("{ext}w")));
    }
    candidates.push(raster.with_extension("wld"));
    candidates.dedup();
    candidates
}

/// Georeferencing a raster carries natively.
///
/// GeoTIFF tags are read at most once, on first use.
struct NativeGeoreference<'a> {
    raster: &'a Path,
    tags: OnceCell<Option<GeoTiffInfo>>,
}

impl<'a> NativeGeoreference<'a> {
    fn new(raster: &'a Path) -> Self {
        Self {
            raster,
            tags: OnceCell::new(),
        }
    }

    fn tags(&self) -> Option<&GeoTiffInfo> {
        self.tags
            .get_or_init(|| {
                if !is_tiff(self.raster) {
                    return None;
                }
                read_geotiff(self.raster).filter(|info| !info.is_empty())
            })
            .as_ref()
    }

    /// Spatial reference from a `.prj` sidecar or GeoTIFF keys.
    fn spatial_reference(&self) -> Option<SpatialReference> {
        let prj = prj_path(self.raster);
        if let Ok(wkt) = std::fs::read_to_string(&prj) {
            match SpatialReference::from_wkt(&wkt) {
                Some(sr) => return Some(sr),
                None => log::debug!("Ignoring unreadable projection file {}", prj.display()),
            }
        }
        self.tags()?.spatial_reference()
    }

    /// Pixel-to-map transform from a world file or GeoTIFF tags.
    fn transform(&self) -> Option<WorldFile> {
        if let Some(wf) = world_file_candidates(self.raster)
            .iter()
            .find_map(|p| WorldFile::read(p))
        {
            return Some(wf);
        }
        let (x, y, sx, sy) = self.tags()?.corner_transform()?;
        // World files reference the centre of the upper-left pixel.
        Some(WorldFile {
            pixel_width: sx,
            row_rotation: 0.0,
            column_rotation: 0.0,
            pixel_height: -sy,
            origin_x: x + sx / 2.0,
            origin_y: y - sy / 2.0,
        })
    }
}

/// Load and decode a raster from disk.
fn load_raster(path: &Path) -> Result<DynamicImage, EngineError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| match e {
            ImageError::Unsupported(_) => {
                EngineError::UnsupportedFormat(format!("{}: {}", path.display(), e))
            }
            other => EngineError::ProcessingFailed(format!(
                "Failed to decode {}: {}",
                path.display(),
                other
            )),
        })
}

/// Reduce any decoded raster to 8-bit RGB.
///
/// 8-bit sources are converted directly. Deeper sources are linearly stretched
/// so their actual value range fills 0–255.
fn to_rgb8(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_) => img.to_rgb8(),
        deep => stretch_to_rgb8(&deep),
    }
}

fn stretch_to_rgb8(img: &DynamicImage) -> RgbImage {
    let rgb = img.to_rgb32f();
    let (width, height) = rgb.dimensions();
    let samples = rgb.into_raw();

    let (min, max) = samples
        .par_iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), v| (lo.min(v), hi.max(v)),
        )
        .reduce(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(a, b), (c, d)| (a.min(c), b.max(d)),
        );
    let range = max - min;

    let bytes: Vec<u8> = samples
        .par_iter()
        .map(|&v| {
            if !v.is_finite() || range <= 0.0 {
                0
            } else {
                ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8
            }
        })
        .collect();

    RgbImage::from_raw(width, height, bytes).unwrap_or_else(|| RgbImage::new(width, height))
}

fn save_jpeg(img: RgbImage, path: &Path, quality: u32) -> Result<(), EngineError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100) as u8);
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(encoder)
        .map_err(|e| EngineError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl RasterEngine for RustEngine {
    fn describe(&self, path: &Path) -> Result<CrsStatus, EngineError> {
        std::fs::metadata(path)?;
        Ok(match NativeGeoreference::new(path).spatial_reference() {
            Some(sr) if sr.name != CrsStatus::Unknown.name() => CrsStatus::Known(sr.name),
            _ => CrsStatus::Unknown,
        })
    }

    fn define_projection(&self, path: &Path, sr: &SpatialReference) -> Result<(), EngineError> {
        std::fs::write(prj_path(path), &sr.wkt)?;
        Ok(())
    }

    fn copy_raster(&self, params: &CopyParams) -> Result<(), EngineError> {
        let img = load_raster(&params.source)?;
        let reduced = match params.pixel_type {
            PixelType::U8 => to_rgb8(img),
        };
        save_jpeg(reduced, &params.output, params.quality.value())?;

        // Same pixel grid, so the source transform applies unchanged.
        let native = NativeGeoreference::new(&params.source);
        if let Some(wf) = native.transform() {
            wf.write(&world_file_path(&params.output))?;
        }
        if let Some(sr) = native.spatial_reference() {
            self.define_projection(&params.output, &sr)?;
        }
        Ok(())
    }

    fn extent(&self, path: &Path) -> Result<Extent, EngineError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| match e {
            ImageError::IoError(io) => EngineError::Io(io),
            other => EngineError::ProcessingFailed(format!(
                "Failed to read dimensions of {}: {}",
                path.display(),
                other
            )),
        })?;
        let (w, h) = (width as f64, height as f64);

        let Some(wf) = NativeGeoreference::new(path).transform() else {
            return Ok(Extent {
                xmin: 0.0,
                ymin: 0.0,
                xmax: w,
                ymax: h,
            });
        };

        // Outer pixel corners, in pixel-centre coordinates.
        let corners = [(-0.5, -0.5), (w - 0.5, -0.5), (-0.5, h - 0.5), (w - 0.5, h - 0.5)];
        let mut extent = Extent {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        };
        for (col, row) in corners {
            let x = wf.pixel_width * col + wf.column_rotation * row + wf.origin_x;
            let y = wf.row_rotation * col + wf.pixel_height * row + wf.origin_y;
            extent.xmin = extent.xmin.min(x);
            extent.xmax = extent.xmax.max(x);
            extent.ymin = extent.ymin.min(y);
            extent.ymax = extent.ymax.max(y);
        }
        Ok(extent)
    }
}
