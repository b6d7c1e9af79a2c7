//! Minimal ESRI shapefile reader.
//!
//! Reads the geometry from `.shp` and the attributes from the matching
//! `.dbf`, pairing them by record order. Only what the georeferencing table
//! needs is decoded:
//!
//! - Point, PointZ, PointM: the point itself
//! - every other shape type: the centre of its bounding box
//! - null shapes and deleted dBASE rows: skipped
//!
//! `.shp` layout: a 100-byte header, then records of a big-endian
//! (number, content length in 16-bit words) header followed by little-endian
//! content starting with the shape type.
//!
//! `.dbf` layout: a 32-byte header, 32-byte field descriptors terminated by
//! `0x0D`, then fixed-width records each prefixed by a deletion flag.

use super::table::{AttributeTable, FieldValue, PointRecord, TableError};
use std::path::Path;

const SHP_FILE_CODE: i32 = 9994;
const SHP_HEADER_LEN: usize = 100;

const SHAPE_NULL: i32 = 0;
const SHAPE_POINT: i32 = 1;
const SHAPE_POINT_Z: i32 = 11;
const SHAPE_POINT_M: i32 = 21;

const DBF_FIELD_TERMINATOR: u8 = 0x0D;
const DBF_DELETED: u8 = 0x2A;

/// Load `path` (`.shp`) and its `.dbf` sibling into an attribute table.
pub fn read_shapefile(path: &Path) -> Result<AttributeTable, TableError> {
    let label = path.display().to_string();
    let shp = std::fs::read(path)?;
    let dbf = std::fs::read(path.with_extension("dbf"))?;

    let points = parse_shp(&shp).map_err(|reason| TableError::Malformed {
        path: label.clone(),
        reason,
    })?;
    let (fields, rows) = parse_dbf(&dbf).map_err(|reason| TableError::Malformed {
        path: path.with_extension("dbf").display().to_string(),
        reason,
    })?;
    if points.len() != rows.len() {
        return Err(TableError::Malformed {
            path: label,
            reason: format!(
                "{} shapes but {} attribute rows",
                points.len(),
                rows.len()
            ),
        });
    }

    let records = points
        .into_iter()
        .zip(rows)
        .filter_map(|(point, row)| {
            let (x, y) = point?;
            let values = row?;
            Some(PointRecord { values, x, y })
        })
        .collect();

    Ok(AttributeTable { fields, records })
}

fn be_i32(data: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_be_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

fn le_i32(data: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_le_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

fn le_f64(data: &[u8], at: usize) -> Option<f64> {
    Some(f64::from_le_bytes(data.get(at..at + 8)?.try_into().ok()?))
}

/// Location of every record, `None` for null shapes.
fn parse_shp(data: &[u8]) -> Result<Vec<Option<(f64, f64)>>, String> {
    if be_i32(data, 0) != Some(SHP_FILE_CODE) {
        return Err("not a shapefile".into());
    }
    if data.len() < SHP_HEADER_LEN {
        return Err("truncated header".into());
    }

    let mut points = Vec::new();
    let mut pos = SHP_HEADER_LEN;
    while pos + 8 <= data.len() {
        let content_words = be_i32(data, pos + 4).ok_or("truncated record header")?;
        let content = pos + 8;
        let content_len = usize::try_from(content_words)
            .map_err(|_| format!("negative record length at byte {pos}"))?
            * 2;
        if content + content_len > data.len() {
            return Err(format!("record at byte {pos} runs past end of file"));
        }

        let shape_type = le_i32(data, content).ok_or("truncated record")?;
        let point = match shape_type {
            SHAPE_NULL => None,
            SHAPE_POINT | SHAPE_POINT_Z | SHAPE_POINT_M => Some((
                le_f64(data, content + 4).ok_or("truncated point")?,
                le_f64(data, content + 12).ok_or("truncated point")?,
            )),
            _ => {
                let xmin = le_f64(data, content + 4).ok_or("truncated bounding box")?;
                let ymin = le_f64(data, content + 12).ok_or("truncated bounding box")?;
                let xmax = le_f64(data, content + 20).ok_or("truncated bounding box")?;
                let ymax = le_f64(data, content + 28).ok_or("truncated bounding box")?;
                Some(((xmin + xmax) / 2.0, (ymin + ymax) / 2.0))
            }
        };
        points.push(point);
        pos = content + content_len;
    }
    Ok(points)
}

struct DbfField {
    name: String,
    kind: u8,
    length: usize,
}

/// Field names and every row's values, `None` for deleted rows.
#[allow(clippy::type_complexity)]
fn parse_dbf(data: &[u8]) -> Result<(Vec<String>, Vec<Option<Vec<FieldValue>>>), String> {
    if data.len() < 32 {
        return Err("truncated header".into());
    }
    let count = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let record_len = u16::from_le_bytes([data[10], data[11]]) as usize;
    if record_len == 0 {
        return Err("invalid record length".into());
    }

    let mut fields = Vec::new();
    let mut pos = 32;
    while pos < header_len.min(data.len()) && data[pos] != DBF_FIELD_TERMINATOR {
        let desc = data.get(pos..pos + 32).ok_or("truncated field descriptor")?;
        let name_end = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: String::from_utf8_lossy(&desc[..name_end]).trim().to_string(),
            kind: desc[11],
            length: desc[16] as usize,
        });
        pos += 32;
    }

    let mut rows = Vec::with_capacity(count.min(data.len() / record_len));
    for n in 0..count {
        let start = header_len + n * record_len;
        let record = data
            .get(start..start + record_len)
            .ok_or_else(|| format!("record {} runs past end of file", n + 1))?;
        if record.first() == Some(&DBF_DELETED) {
            rows.push(None);
            continue;
        }
        let mut at = 1;
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            let raw = record
                .get(at..at + field.length)
                .ok_or_else(|| format!("record {} is shorter than its fields", n + 1))?;
            values.push(decode_value(field.kind, raw));
            at += field.length;
        }
        rows.push(Some(values));
    }

    Ok((fields.into_iter().map(|f| f.name).collect(), rows))
}

fn decode_value(kind: u8, raw: &[u8]) -> FieldValue {
    let text = String::from_utf8_lossy(raw).trim().to_string();
    if text.is_empty() {
        return FieldValue::Null;
    }
    match kind {
        b'N' | b'F' => text
            .parse::<f64>()
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null),
        _ => FieldValue::Text(text),
    }
}
