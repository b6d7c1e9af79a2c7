//! The metadata CSV: descriptive fields to copy onto each raster.
//!
//! Semicolon-delimited UTF-8 with a header row:
//!
//! ```text
//! index;source file location;title;tags;summary;description;credits;Use limitations
//! 1;/data/county-1987/1987/f3_0042.tif;Flight 3 frame 42;aerial;...;...;USDA;Public
//! ```
//!
//! Rows are keyed by the second column, compared exactly against the source
//! path as the loader enumerates it. The listing generator
//! ([`listing`](crate::listing)) writes paths the same way, so its output can
//! be filled in and fed straight back to the loader.

use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub const CATALOG_DELIMITER: u8 = b';';

pub const CATALOG_HEADER: [&str; 8] = [
    "index",
    "source file location",
    "title",
    "tags",
    "summary",
    "description",
    "credits",
    "Use limitations",
];

/// One catalog row. Columns past the end of a short row read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub index: String,
    pub source: String,
    pub title: String,
    pub tags: String,
    pub summary: String,
    pub description: String,
    pub credits: String,
    pub use_limitations: String,
}

impl MetadataRow {
    fn from_record(record: &csv::StringRecord) -> Option<Self> {
        if record.len() < 2 {
            return None;
        }
        let col = |i: usize| record.get(i).unwrap_or("").to_string();
        Some(Self {
            index: col(0),
            source: col(1),
            title: col(2),
            tags: col(3),
            summary: col(4),
            description: col(5),
            credits: col(6),
            use_limitations: col(7),
        })
    }

    fn to_record(&self) -> [&str; 8] {
        [
            self.index.as_str(),
            self.source.as_str(),
            self.title.as_str(),
            self.tags.as_str(),
            self.summary.as_str(),
            self.description.as_str(),
            self.credits.as_str(),
            self.use_limitations.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCatalog {
    rows: Vec<MetadataRow>,
}

impl MetadataCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse catalog CSV. The first row is always treated as the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(CATALOG_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut rows = Vec::new();
        for record in rdr.records() {
            if let Some(row) = MetadataRow::from_record(&record?) {
                rows.push(row);
            }
        }
        Ok(Self { rows })
    }

    /// Load the catalog, or an empty one when there is none or it can't be read.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(catalog) => {
                log::info!(
                    "Loaded {} metadata rows from {}",
                    catalog.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                log::warn!(
                    "Metadata CSV {} could not be read, continuing without it: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Row whose source column equals `source`'s path text.
    pub fn lookup(&self, source: &Path) -> Option<&MetadataRow> {
        let key = source.to_string_lossy();
        self.rows.iter().find(|row| row.source == key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Write rows in catalog form, header first.
pub fn write_catalog<W: Write>(writer: W, rows: &[MetadataRow]) -> Result<(), CatalogError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(CATALOG_DELIMITER)
        .from_writer(writer);
    wtr.write_record(CATALOG_HEADER)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}
