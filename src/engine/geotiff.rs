//! Minimal GeoTIFF tag reader.
//!
//! Pulls the georeferencing out of the first IFD of a TIFF file:
//! - ModelPixelScale (33550): ground size of one pixel
//! - ModelTiepoint (33922): raster (i, j) ↔ model (x, y) anchor
//! - GeoKeyDirectory (34735) + GeoAsciiParams (34737): the CRS keys
//!
//! Only the keys needed to name a CRS are decoded:
//!
//! | Key | Name | Use |
//! |---|---|---|
//! | 1026 | GTCitation | fallback name |
//! | 2048 | GeographicType | EPSG code |
//! | 2049 | GeogCitation | fallback name |
//! | 3072 | ProjectedCSType | EPSG code (preferred) |
//! | 3073 | PCSCitation | fallback name |
//!
//! Code 32767 means "user-defined" and is treated as absent.

use super::spatial_ref::{SpatialReference, display_name};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GEO_ASCII_PARAMS: u16 = 34737;

const KEY_GT_CITATION: u16 = 1026;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_GEOG_CITATION: u16 = 2049;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;
const KEY_PCS_CITATION: u16 = 3073;

const USER_DEFINED: u16 = 32767;

/// Georeferencing found in a GeoTIFF header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTiffInfo {
    pub pixel_scale: Option<[f64; 2]>,
    /// (i, j, x, y) of the first tie point.
    pub tiepoint: Option<[f64; 4]>,
    pub projected_type: Option<u16>,
    pub geographic_type: Option<u16>,
    pub citation: Option<String>,
}

impl GeoTiffInfo {
    /// Whether the header carried any GeoTIFF tag at all.
    pub fn is_empty(&self) -> bool {
        self == &GeoTiffInfo::default()
    }

    /// CRS named by the keys: EPSG codes first, then citations.
    pub fn spatial_reference(&self) -> Option<SpatialReference> {
        let from_code = [self.projected_type, self.geographic_type]
            .into_iter()
            .flatten()
            .find_map(SpatialReference::from_epsg);
        from_code.or_else(|| {
            self.citation
                .as_deref()
                .map(display_name)
                .filter(|name| !name.is_empty())
                .map(SpatialReference::local)
        })
    }

    /// Model coordinates of the raster's upper-left corner and the pixel size.
    ///
    /// Returns `(origin_x, origin_y, pixel_width, pixel_height)` with the pixel
    /// height positive (rows grow southwards).
    pub fn corner_transform(&self) -> Option<(f64, f64, f64, f64)> {
        let [sx, sy] = self.pixel_scale?;
        let [i, j, x, y] = self.tiepoint?;
        Some((x - i * sx, y + j * sy, sx, sy))
    }
}

/// Read GeoTIFF tags from a file. `None` when it isn't a readable TIFF.
///
/// Only the header, the first IFD and the tag values it points at are read.
pub fn read_geotiff(path: &Path) -> Option<GeoTiffInfo> {
    let file = File::open(path).ok()?;
    parse_geotiff_from(BufReader::new(file))
}

/// Seeking reader over a TIFF stream with the file's byte order.
struct Reader<R> {
    source: R,
    len: u64,
    big_endian: bool,
}

impl<R: Read + Seek> Reader<R> {
    /// `len` bytes at `offset`, `None` past the end of the stream.
    fn bytes(&mut self, offset: usize, len: usize) -> Option<Vec<u8>> {
        let end = (offset as u64).checked_add(len as u64)?;
        if end > self.len {
            return None;
        }
        self.source.seek(SeekFrom::Start(offset as u64)).ok()?;
        let mut buf = vec![0u8; len];
        self.source.read_exact(&mut buf).ok()?;
        Some(buf)
    }

    fn array<const N: usize>(&mut self, offset: usize) -> Option<[u8; N]> {
        self.bytes(offset, N)?.try_into().ok()
    }

    fn u16(&mut self, offset: usize) -> Option<u16> {
        let b = self.array(offset)?;
        Some(if self.big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    fn u32(&mut self, offset: usize) -> Option<u32> {
        let b = self.array(offset)?;
        Some(if self.big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    fn f64(&mut self, offset: usize) -> Option<f64> {
        let b = self.array(offset)?;
        Some(if self.big_endian {
            f64::from_be_bytes(b)
        } else {
            f64::from_le_bytes(b)
        })
    }
}

struct Entry {
    tag: u16,
    count: usize,
    /// Start of the value bytes (inline or referenced).
    value_at: usize,
}

fn type_size(typ: u16) -> usize {
    match typ {
        1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => 2,         // SHORT, SSHORT
        4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
        5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
        _ => 1,
    }
}

/// Parse GeoTIFF tags from raw TIFF bytes.
pub fn parse_geotiff(data: &[u8]) -> Option<GeoTiffInfo> {
    parse_geotiff_from(Cursor::new(data))
}

fn parse_geotiff_from<R: Read + Seek>(mut source: R) -> Option<GeoTiffInfo> {
    let len = source.seek(SeekFrom::End(0)).ok()?;
    let mut r = Reader {
        source,
        len,
        big_endian: false,
    };
    r.big_endian = match &r.bytes(0, 2)?[..] {
        b"MM" => true,
        b"II" => false,
        _ => return None,
    };
    if r.u16(2)? != 42 {
        return None;
    }

    let ifd = r.u32(4)? as usize;
    let entry_count = r.u16(ifd)? as usize;
    let mut entries = Vec::new();
    for n in 0..entry_count {
        let at = ifd + 2 + n * 12;
        let tag = r.u16(at)?;
        let typ = r.u16(at + 2)?;
        let count = r.u32(at + 4)? as usize;
        // Values of 4 bytes or less sit in the offset field itself.
        let value_at = if count.saturating_mul(type_size(typ)) <= 4 {
            at + 8
        } else {
            r.u32(at + 8)? as usize
        };
        entries.push(Entry {
            tag,
            count,
            value_at,
        });
    }
    let find = |tag: u16| entries.iter().find(|e| e.tag == tag);

    let mut info = GeoTiffInfo::default();

    if let Some(e) = find(TAG_MODEL_PIXEL_SCALE).filter(|e| e.count >= 2) {
        info.pixel_scale = Some([r.f64(e.value_at)?, r.f64(e.value_at + 8)?]);
    }
    if let Some(e) = find(TAG_MODEL_TIEPOINT).filter(|e| e.count >= 6) {
        info.tiepoint = Some([
            r.f64(e.value_at)?,
            r.f64(e.value_at + 8)?,
            r.f64(e.value_at + 24)?,
            r.f64(e.value_at + 32)?,
        ]);
    }

    let ascii = find(TAG_GEO_ASCII_PARAMS)
        .map(|e| (e.value_at, e.count))
        .and_then(|(at, count)| r.bytes(at, count))
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    if let Some(dir) = find(TAG_GEO_KEY_DIRECTORY) {
        let key_count = r.u16(dir.value_at + 6)? as usize;
        let mut citations: [Option<String>; 3] = [None, None, None];
        for k in 0..key_count.min(dir.count.saturating_sub(4) / 4) {
            let at = dir.value_at + 8 + k * 8;
            let key = r.u16(at)?;
            let location = r.u16(at + 2)?;
            let count = r.u16(at + 4)? as usize;
            let value = r.u16(at + 6)?;

            match (key, location) {
                (KEY_PROJECTED_CS_TYPE, 0) if value != 0 && value != USER_DEFINED => {
                    info.projected_type = Some(value);
                }
                (KEY_GEOGRAPHIC_TYPE, 0) if value != 0 && value != USER_DEFINED => {
                    info.geographic_type = Some(value);
                }
                (KEY_PCS_CITATION | KEY_GT_CITATION | KEY_GEOG_CITATION, TAG_GEO_ASCII_PARAMS) => {
                    let start = value as usize;
                    let text = ascii
                        .get(start..start + count)
                        .map(|s| s.trim_end_matches(['|', '\0']).trim().to_string())
                        .filter(|s| !s.is_empty());
                    let slot = match key {
                        KEY_PCS_CITATION => 0,
                        KEY_GT_CITATION => 1,
                        _ => 2,
                    };
                    citations[slot] = text;
                }
                _ => {}
            }
        }
        info.citation = citations.into_iter().flatten().next();
    }

    Some(info)
}
