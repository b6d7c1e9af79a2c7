//! World files and the scanned-photo calibration table.
//!
//! A world file is six lines of text describing the affine transform from
//! pixel (column, row) to map (x, y):
//!
//! ```text
//! pixel width          A
//! row rotation         D
//! column rotation      B
//! pixel height         E   (negative for north-up images)
//! origin x             C
//! origin y             F
//! ```
//!
//! The calibration table gives the ground pixel size and the offset from the
//! photo centre to its upper-left corner for each flight direction and survey
//! scale. North-south flights produce axis-aligned images. East-west flights
//! were scanned rotated by a quarter turn, so their transform swaps the
//! diagonal into the rotation terms.

use std::fmt;
use std::path::{Path, PathBuf};

/// Six-parameter affine transform in world-file line order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl WorldFile {
    /// Values in file order.
    pub fn values(&self) -> [f64; 6] {
        [
            self.pixel_width,
            self.row_rotation,
            self.column_rotation,
            self.pixel_height,
            self.origin_x,
            self.origin_y,
        ]
    }

    /// Parse the six-line text form. Blank lines are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut values = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| l.parse::<f64>().ok());
        let mut next = || values.next().flatten();
        Some(Self {
            pixel_width: next()?,
            row_rotation: next()?,
            column_rotation: next()?,
            pixel_height: next()?,
            origin_x: next()?,
            origin_y: next()?,
        })
    }

    pub fn read(path: &Path) -> Option<Self> {
        Self::parse(&std::fs::read_to_string(path).ok()?)
    }

    /// Write the world file, replacing any existing one.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for WorldFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.values() {
            writeln!(f, "{value}")?;
        }
        Ok(())
    }
}

/// Flight direction code from the attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightDirection {
    NorthSouth,
    EastWest,
}

impl FlightDirection {
    /// `NS` or `EW`, compared exactly.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NS" => Some(FlightDirection::NorthSouth),
            "EW" => Some(FlightDirection::EastWest),
            _ => None,
        }
    }
}

/// One row of the calibration table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub direction: FlightDirection,
    pub scale: &'static str,
    pub pixel_size: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Calibration {
    /// World file for a photo centred on (`x`, `y`).
    pub fn world_file(&self, x: f64, y: f64) -> WorldFile {
        let p = self.pixel_size;
        let (origin_x, origin_y) = (x + self.offset_x, y + self.offset_y);
        match self.direction {
            FlightDirection::NorthSouth => WorldFile {
                pixel_width: p,
                row_rotation: 0.0,
                column_rotation: 0.0,
                pixel_height: -p,
                origin_x,
                origin_y,
            },
            FlightDirection::EastWest => WorldFile {
                pixel_width: 0.0,
                row_rotation: p,
                column_rotation: p,
                pixel_height: 0.0,
                origin_x,
                origin_y,
            },
        }
    }
}

const fn entry(
    direction: FlightDirection,
    scale: &'static str,
    pixel_size: f64,
    offset_x: f64,
    offset_y: f64,
) -> Calibration {
    Calibration {
        direction,
        scale,
        pixel_size,
        offset_x,
        offset_y,
    }
}

use FlightDirection::{EastWest as EW, NorthSouth as NS};

/// Supported (direction, scale) pairs. EW has no 1:60000 entry.
pub const CALIBRATION: &[Calibration] = &[
    entry(NS, "10000", 0.172, -1600.0, 1600.0),
    entry(NS, "20000", 0.337, -3050.0, 3050.0),
    entry(NS, "40000", 0.63, -6000.0, 6000.0),
    entry(NS, "60000", 1.01, -9900.0, 10500.0),
    entry(EW, "10000", 0.172, -1600.0, 1600.0),
    entry(EW, "20000", 0.337, -3050.0, -3050.0),
    entry(EW, "40000", 0.63, -6000.0, 6000.0),
];

/// Calibration for a direction and scale code. The scale is compared as text.
pub fn lookup(direction: FlightDirection, scale: &str) -> Option<&'static Calibration> {
    CALIBRATION
        .iter()
        .find(|c| c.direction == direction && c.scale == scale)
}

/// Sidecar path of the world file for a raster.
///
/// TIFFs use `.tfw`. Other formats take the first and last letters of the
/// extension plus `w` (`.jpg` → `.jgw`, `.png` → `.pgw`, `.jp2` → `.j2w`).
pub fn world_file_path(raster: &Path) -> PathBuf {
    let ext = raster
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let world_ext = match ext.as_str() {
        "tif" | "tiff" => "tfw".to_string(),
        "" => "wld".to_string(),
        _ => {
            let mut chars = ext.chars();
            let first = chars.next().unwrap_or('w');
            let last = chars.last().unwrap_or(first);
            format!("{first}{last}w")
        }
    };
    raster.with_extension(world_ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn synth(direction: FlightDirection, scale: &str) -> [f64; 6] {
        lookup(direction, scale)
            .unwrap()
            .world_file(100000.0, 200000.0)
            .values()
    }

    // =========================================================================
    // Calibration table
    // =========================================================================

    #[test]
    fn north_south_entries() {
        assert_eq!(
            synth(NS, "10000"),
            [0.172, 0.0, 0.0, -0.172, 98400.0, 201600.0]
        );
        assert_eq!(
            synth(NS, "20000"),
            [0.337, 0.0, 0.0, -0.337, 96950.0, 203050.0]
        );
        assert_eq!(synth(NS, "40000"), [0.63, 0.0, 0.0, -0.63, 94000.0, 206000.0]);
        assert_eq!(synth(NS, "60000"), [1.01, 0.0, 0.0, -1.01, 90100.0, 210500.0]);
    }

    #[test]
    fn east_west_entries_are_rotated() {
        assert_eq!(
            synth(EW, "10000"),
            [0.0, 0.172, 0.172, 0.0, 98400.0, 201600.0]
        );
        assert_eq!(
            synth(EW, "20000"),
            [0.0, 0.337, 0.337, 0.0, 96950.0, 196950.0]
        );
        assert_eq!(synth(EW, "40000"), [0.0, 0.63, 0.63, 0.0, 94000.0, 206000.0]);
    }

    #[test]
    fn unsupported_pairs_have_no_entry() {
        assert!(lookup(EW, "60000").is_none());
        assert!(lookup(NS, "15000").is_none());
        assert!(lookup(NS, "10000.0").is_none());
        assert!(lookup(NS, "").is_none());
    }

    #[test]
    fn direction_codes_are_exact() {
        assert_eq!(FlightDirection::from_code("NS"), Some(NS));
        assert_eq!(FlightDirection::from_code("EW"), Some(EW));
        assert_eq!(FlightDirection::from_code("ns"), None);
        assert_eq!(FlightDirection::from_code("NE"), None);
    }

    // =========================================================================
    // Text form
    // =========================================================================

    #[test]
    fn writes_six_lines_in_order() {
        let wf = lookup(NS, "10000").unwrap().world_file(100000.0, 200000.0);
        assert_eq!(wf.to_string(), "0.172\n0\n0\n-0.172\n98400\n201600\n");
    }

    #[test]
    fn parse_reads_back_written_text() {
        let wf = lookup(EW, "40000").unwrap().world_file(5.5, -7.25);
        assert_eq!(WorldFile::parse(&wf.to_string()), Some(wf));
    }

    #[test]
    fn parse_rejects_short_or_garbled_files() {
        assert_eq!(WorldFile::parse("1\n0\n0\n-1\n10\n"), None);
        assert_eq!(WorldFile::parse("1\n0\nzero\n-1\n10\n20\n"), None);
    }

    #[test]
    fn regenerating_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.tfw");
        let first = lookup(NS, "10000").unwrap().world_file(0.0, 0.0);
        let second = lookup(NS, "20000").unwrap().world_file(0.0, 0.0);
        first.write(&path).unwrap();
        second.write(&path).unwrap();
        assert_eq!(WorldFile::read(&path), Some(second));
    }

    #[test]
    fn world_file_extension_follows_raster_format() {
        assert_eq!(world_file_path(Path::new("/a/scan.tif")), Path::new("/a/scan.tfw"));
        assert_eq!(world_file_path(Path::new("/a/scan.TIFF")), Path::new("/a/scan.tfw"));
        assert_eq!(world_file_path(Path::new("/a/scan.jpg")), Path::new("/a/scan.jgw"));
        assert_eq!(world_file_path(Path::new("/a/scan.png")), Path::new("/a/scan.pgw"));
        assert_eq!(world_file_path(Path::new("/a/scan.jp2")), Path::new("/a/scan.j2w"));
        assert_eq!(world_file_path(Path::new("/a/scan")), Path::new("/a/scan.wld"));
    }
}
