//! Point attribute tables.
//!
//! The georeferencing table lists one point per photo centre, with the
//! attributes that identify the photo and its flight. Two on-disk forms are
//! accepted:
//!
//! | Extension | Reader | Coordinates |
//! |---|---|---|
//! | `.shp` / `.dbf` | [`shapefile`](super::shapefile) | point geometry, or bounding-box centre |
//! | `.csv` | `csv` crate, comma-delimited with header | `x`/`y` (or `point_x`, `longitude`, …) columns |
//!
//! Rows without geometry are dropped on load since they can never place a
//! photo.

use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("Unsupported attribute table format: {0}")]
    UnsupportedFormat(String),
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
}

impl fmt::Display for FieldValue {
    /// Numbers print without a trailing `.0`, so a scale of `10000.0` reads `10000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// One row: attribute values in field order plus the point location.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub values: Vec<FieldValue>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeTable {
    pub fields: Vec<String>,
    pub records: Vec<PointRecord>,
}

const X_COLUMNS: &[&str] = &["x", "point_x", "shape_x", "longitude", "long", "lon"];
const Y_COLUMNS: &[&str] = &["y", "point_y", "shape_y", "latitude", "lat"];

impl AttributeTable {
    /// Open a table, dispatching on the file extension.
    pub fn open(path: &Path) -> Result<Self, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "shp" | "dbf" => super::shapefile::read_shapefile(&path.with_extension("shp")),
            "csv" => Self::from_csv_path(path),
            _ => Err(TableError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Position of a field, compared case-insensitively.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.eq_ignore_ascii_case(name))
    }

    fn from_csv_path(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_csv(file, &path.display().to_string())
    }

    /// Read a comma-delimited table with a header row.
    pub fn from_csv<R: std::io::Read>(reader: R, label: &str) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let fields: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let find = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|c| fields.iter().position(|f| f.eq_ignore_ascii_case(c)))
        };
        let malformed = |reason: String| TableError::Malformed {
            path: label.to_string(),
            reason,
        };
        let x_col = find(X_COLUMNS).ok_or_else(|| malformed("no X coordinate column".into()))?;
        let y_col = find(Y_COLUMNS).ok_or_else(|| malformed("no Y coordinate column".into()))?;

        let mut records = Vec::new();
        for (line, row) in rdr.records().enumerate() {
            let row = row?;
            let coord = |col: usize| row.get(col).map(str::trim).unwrap_or("");
            let (xs, ys) = (coord(x_col), coord(y_col));
            if xs.is_empty() || ys.is_empty() {
                log::debug!("{label}: row {} has no coordinates, skipped", line + 2);
                continue;
            }
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| malformed(format!("row {}: bad coordinate {s:?}", line + 2)))
            };
            let (x, y) = (parse(xs)?, parse(ys)?);

            let values = (0..fields.len())
                .map(|i| match row.get(i).map(str::trim) {
                    None | Some("") => FieldValue::Null,
                    Some(s) => FieldValue::Text(s.to_string()),
                })
                .collect();
            records.push(PointRecord { values, x, y });
        }

        Ok(Self { fields, records })
    }
}
