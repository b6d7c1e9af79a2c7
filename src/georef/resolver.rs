//! Synthetic georeferencing from the attribute table.
//!
//! For a raster with no spatial reference, find the table row describing its
//! photo centre and turn that row into a world file:
//!
//! 1. The path, flight-direction and scale fields must all exist.
//! 2. The first row whose path value contains the raster's base name (file
//!    name without extension) is the match. Later matches are only logged.
//! 3. The matched row must have a flight direction.
//! 4. (direction, scale) selects a [`Calibration`](super::worldfile::Calibration)
//!    entry, which places the world file around the row's point.
//!
//! Every way this can fail is a [`GeoreferenceFailure`] whose message is
//! recorded verbatim in the audit log.

use super::table::{AttributeTable, FieldValue, PointRecord};
use super::worldfile::{self, FlightDirection, WorldFile, world_file_path};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Names of the attribute fields the resolver reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoreferenceFields {
    pub path: String,
    pub flight_direction: String,
    pub scale: String,
}

impl Default for GeoreferenceFields {
    fn default() -> Self {
        Self {
            path: "PATH".to_string(),
            flight_direction: "FLT_DIR".to_string(),
            scale: "SCALE".to_string(),
        }
    }
}

/// A required attribute field, named by its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Path,
    FlightDirection,
    Scale,
}

impl Column {
    pub fn label(self) -> &'static str {
        match self {
            Column::Path => "path",
            Column::FlightDirection => "flt_dir",
            Column::Scale => "scale",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoreferenceFailure {
    #[error("{}", missing_columns_message(.0))]
    MissingColumns(Vec<Column>),
    #[error("No referencing Info for this image in the SHP")]
    NoMatch,
    #[error("Referencing Info found but empty FLT_DIR")]
    EmptyFlightDirection,
    #[error("{}", unsupported_scale_message(.raster, .direction))]
    UnsupportedScale {
        raster: String,
        direction: FlightDirection,
    },
    #[error("{raster} SHP does not have a standard FLT_DIR attribute, and a world file could not be created.")]
    UnsupportedDirection { raster: String },
    #[error("Attribute table could not be opened: {0}")]
    TableUnavailable(String),
    #[error("World file could not be written: {0}")]
    WorldFileWrite(String),
}

fn missing_columns_message(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| format!("Missing {} Column", c.label()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn unsupported_scale_message(raster: &str, direction: &FlightDirection) -> String {
    match direction {
        FlightDirection::NorthSouth => {
            format!("{raster} SHP is missing scale information and cannot be rendered.")
        }
        FlightDirection::EastWest => format!(
            "{raster} SHP is missing scale information, and a world file could not be created."
        ),
    }
}

/// Base name used for matching: the file name without its extension.
fn raster_base_name(raster: &Path) -> String {
    raster
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compute the world file for `raster` without touching the filesystem.
pub fn synthesize(
    table: &AttributeTable,
    raster: &Path,
    fields: &GeoreferenceFields,
) -> Result<WorldFile, GeoreferenceFailure> {
    let path_col = table.field_index(&fields.path);
    let dir_col = table.field_index(&fields.flight_direction);
    let scale_col = table.field_index(&fields.scale);
    let (Some(path_col), Some(dir_col), Some(scale_col)) = (path_col, dir_col, scale_col) else {
        let missing = [
            (path_col, Column::Path),
            (dir_col, Column::FlightDirection),
            (scale_col, Column::Scale),
        ]
        .into_iter()
        .filter_map(|(idx, col)| idx.is_none().then_some(col))
        .collect();
        return Err(GeoreferenceFailure::MissingColumns(missing));
    };

    let name = raster_base_name(raster);
    let value = |record: &PointRecord, col: usize| {
        record
            .values
            .get(col)
            .map(FieldValue::to_string)
            .unwrap_or_default()
    };

    let mut matches = table.records.iter().filter(|r| {
        let path = value(r, path_col);
        !path.is_empty() && path.contains(&name)
    });
    let record = matches.next().ok_or(GeoreferenceFailure::NoMatch)?;
    let later = matches.count();
    if later > 0 {
        log::debug!("{name}: {later} more attribute rows match, using the first");
    }

    let direction_code = value(record, dir_col);
    if direction_code.is_empty() {
        return Err(GeoreferenceFailure::EmptyFlightDirection);
    }
    let direction = FlightDirection::from_code(&direction_code)
        .ok_or_else(|| GeoreferenceFailure::UnsupportedDirection { raster: name.clone() })?;

    let scale = value(record, scale_col);
    let calibration = worldfile::lookup(direction, &scale)
        .ok_or_else(|| GeoreferenceFailure::UnsupportedScale {
            raster: name.clone(),
            direction,
        })?;

    Ok(calibration.world_file(record.x, record.y))
}

/// Resolves rasters against one attribute table for a whole run.
///
/// The table is opened once. If that fails, every raster resolves to
/// [`GeoreferenceFailure::TableUnavailable`] rather than aborting the run.
pub struct GeoreferenceResolver {
    table: Result<AttributeTable, String>,
    fields: GeoreferenceFields,
}

impl GeoreferenceResolver {
    pub fn open(table_path: &Path, fields: GeoreferenceFields) -> Self {
        let table = AttributeTable::open(table_path).map_err(|e| {
            log::warn!(
                "Attribute table {} could not be opened: {}",
                table_path.display(),
                e
            );
            e.to_string()
        });
        Self { table, fields }
    }

    pub fn from_table(table: AttributeTable, fields: GeoreferenceFields) -> Self {
        Self {
            table: Ok(table),
            fields,
        }
    }

    /// Write the synthesized world file beside `raster` and return its path.
    pub fn resolve(&self, raster: &Path) -> Result<PathBuf, GeoreferenceFailure> {
        let table = self
            .table
            .as_ref()
            .map_err(|e| GeoreferenceFailure::TableUnavailable(e.clone()))?;
        let world_file = synthesize(table, raster, &self.fields)?;
        let path = world_file_path(raster);
        world_file
            .write(&path)
            .map_err(|e| GeoreferenceFailure::WorldFileWrite(e.to_string()))?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(s: &str) -> FieldValue {
        if s.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Text(s.to_string())
        }
    }

    fn table(rows: &[(&str, &str, &str, f64, f64)]) -> AttributeTable {
        AttributeTable {
            fields: vec!["PATH".into(), "FLT_DIR".into(), "SCALE".into()],
            records: rows
                .iter()
                .map(|(p, d, s, x, y)| PointRecord {
                    values: vec![text(p), text(d), text(s)],
                    x: *x,
                    y: *y,
                })
                .collect(),
        }
    }

    fn fields() -> GeoreferenceFields {
        GeoreferenceFields::default()
    }

    // =========================================================================
    // synthesize
    // =========================================================================

    #[test]
    fn north_south_match_produces_calibrated_world_file() {
        let t = table(&[("1987/scan_0042", "NS", "10000", 100000.0, 200000.0)]);
        let wf = synthesize(&t, Path::new("/src/1987/scan_0042.tif"), &fields()).unwrap();
        assert_eq!(wf.values(), [0.172, 0.0, 0.0, -0.172, 98400.0, 201600.0]);
    }

    #[test]
    fn numeric_scale_field_matches() {
        let mut t = table(&[("scan_0042", "EW", "", 0.0, 0.0)]);
        t.records[0].values[2] = FieldValue::Number(20000.0);
        let wf = synthesize(&t, Path::new("scan_0042.jpg"), &fields()).unwrap();
        assert_eq!(wf.values(), [0.0, 0.337, 0.337, 0.0, -3050.0, -3050.0]);
    }

    #[test]
    fn first_match_wins() {
        let t = table(&[
            ("a/scan_1", "NS", "10000", 0.0, 0.0),
            ("b/scan_1", "NS", "20000", 500.0, 500.0),
        ]);
        let wf = synthesize(&t, Path::new("scan_1.tif"), &fields()).unwrap();
        assert_eq!(wf.pixel_width, 0.172);
    }

    #[test]
    fn match_is_substring_of_path_value() {
        let t = table(&[
            ("", "NS", "10000", 0.0, 0.0),
            ("X:/archive/1987/scan_0042_final", "NS", "40000", 0.0, 0.0),
        ]);
        let wf = synthesize(&t, Path::new("scan_0042.tif"), &fields()).unwrap();
        assert_eq!(wf.pixel_width, 0.63);
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let t = AttributeTable {
            fields: vec!["PATH".into()],
            records: vec![],
        };
        let err = synthesize(&t, Path::new("a.tif"), &fields()).unwrap_err();
        assert_eq!(
            err,
            GeoreferenceFailure::MissingColumns(vec![Column::FlightDirection, Column::Scale])
        );
        assert_eq!(err.to_string(), "Missing flt_dir Column Missing scale Column");
    }

    #[test]
    fn missing_scale_column_message() {
        let t = AttributeTable {
            fields: vec!["PATH".into(), "FLT_DIR".into()],
            records: vec![],
        };
        let err = synthesize(&t, Path::new("a.tif"), &fields()).unwrap_err();
        assert!(err.to_string().contains("Missing scale Column"));
    }

    #[test]
    fn no_match() {
        let t = table(&[("scan_0001", "NS", "10000", 0.0, 0.0)]);
        let err = synthesize(&t, Path::new("scan_0002.tif"), &fields()).unwrap_err();
        assert_eq!(err.to_string(), "No referencing Info for this image in the SHP");
    }

    #[test]
    fn empty_direction() {
        let t = table(&[("scan_0001", "", "10000", 0.0, 0.0)]);
        let err = synthesize(&t, Path::new("scan_0001.tif"), &fields()).unwrap_err();
        assert_eq!(err.to_string(), "Referencing Info found but empty FLT_DIR");
    }

    #[test]
    fn unknown_scale_messages_depend_on_direction() {
        let t = table(&[
            ("ns_0001", "NS", "15000", 0.0, 0.0),
            ("ew_0001", "EW", "60000", 0.0, 0.0),
        ]);
        assert_eq!(
            synthesize(&t, Path::new("ns_0001.tif"), &fields())
                .unwrap_err()
                .to_string(),
            "ns_0001 SHP is missing scale information and cannot be rendered."
        );
        assert_eq!(
            synthesize(&t, Path::new("ew_0001.tif"), &fields())
                .unwrap_err()
                .to_string(),
            "ew_0001 SHP is missing scale information, and a world file could not be created."
        );
    }

    #[test]
    fn non_standard_direction() {
        let t = table(&[("scan_0001", "NE", "10000", 0.0, 0.0)]);
        let err = synthesize(&t, Path::new("scan_0001.tif"), &fields()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "scan_0001 SHP does not have a standard FLT_DIR attribute, and a world file could not be created."
        );
    }

    // =========================================================================
    // GeoreferenceResolver
    // =========================================================================

    #[test]
    fn resolve_writes_world_file_beside_raster() {
        let tmp = TempDir::new().unwrap();
        let raster = tmp.path().join("scan_0042.tif");
        let resolver = GeoreferenceResolver::from_table(
            table(&[("scan_0042", "NS", "10000", 100000.0, 200000.0)]),
            fields(),
        );

        let path = resolver.resolve(&raster).unwrap();
        assert_eq!(path, tmp.path().join("scan_0042.tfw"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "0.172\n0\n0\n-0.172\n98400\n201600\n"
        );
    }

    #[test]
    fn resolve_failure_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let raster = tmp.path().join("scan_0042.tif");
        let resolver = GeoreferenceResolver::from_table(table(&[]), fields());
        assert!(resolver.resolve(&raster).is_err());
        assert!(!tmp.path().join("scan_0042.tfw").exists());
    }

    #[test]
    fn unopenable_table_fails_every_raster() {
        let resolver = GeoreferenceResolver::open(Path::new("/nonexistent/centres.shp"), fields());
        let err = resolver.resolve(Path::new("/src/a.tif")).unwrap_err();
        assert!(matches!(err, GeoreferenceFailure::TableUnavailable(_)));
    }

    #[test]
    fn resolve_from_shapefile() {
        use crate::georef::shapefile::tests::{Shape, write_shapefile};
        let tmp = TempDir::new().unwrap();
        let shp = tmp.path().join("centres.shp");
        write_shapefile(
            &shp,
            &[("PATH", b'C', 40), ("FLT_DIR", b'C', 4), ("SCALE", b'N', 10)],
            &[(Shape::Point(100000.0, 200000.0), vec!["scan_0042", "NS", "10000"])],
        );

        let resolver = GeoreferenceResolver::open(&shp, fields());
        let path = resolver.resolve(&tmp.path().join("scan_0042.jpg")).unwrap();
        assert_eq!(path, tmp.path().join("scan_0042.jgw"));
        let wf = WorldFile::read(&path).unwrap();
        assert_eq!((wf.origin_x, wf.origin_y), (98400.0, 201600.0));
    }
}
