//! Listing images whose descriptive metadata is incomplete.
//!
//! The listing is written in metadata-CSV form, so an operator can fill in the
//! blanks and hand the file straight to `load`:
//!
//! ```text
//! out/NoMetadataImages_19102026_14h05min09.csv
//! index;source file location;title;tags;summary;description;credits;Use limitations
//! 1;/data/county-1987/1987/f3_0042.tif;Flight 3 frame 42;;;;;
//! ```
//!
//! In blank mode metadata is never read and every image gets an empty row.

use crate::catalog::{write_catalog, CatalogError, MetadataRow};
use crate::engine::{MetadataStore, RasterMetadata, SidecarMetadataStore};
use crate::metadata::{is_incomplete, strip_html_wrapper};
use crate::naming::{metadata_listing_name, run_stamp};
use crate::scan::raster_files;
use chrono::{DateTime, Local};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub blank: bool,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingReport {
    pub path: PathBuf,
    pub scanned: usize,
    pub listed: usize,
}

/// Generate the listing using the sidecar metadata store.
pub fn generate(
    request: &ListingRequest,
    started: DateTime<Local>,
) -> Result<ListingReport, CatalogError> {
    generate_with_store(&SidecarMetadataStore::new(), request, started)
}

pub fn generate_with_store(
    store: &dyn MetadataStore,
    request: &ListingRequest,
    started: DateTime<Local>,
) -> Result<ListingReport, CatalogError> {
    let mut rows = Vec::new();
    let mut scanned = 0;

    for image in raster_files(&request.source, &request.extensions) {
        scanned += 1;
        let source = image.to_string_lossy().into_owned();
        let index = (rows.len() + 1).to_string();

        if request.blank {
            rows.push(MetadataRow {
                index,
                source,
                ..Default::default()
            });
            continue;
        }

        let md = match store.read(&image) {
            Ok(md) => md,
            Err(e) => {
                log::warn!("Metadata of {} could not be read: {}", image.display(), e);
                continue;
            }
        };
        if is_incomplete(&md) {
            log::debug!("{} has incomplete metadata", image.display());
            rows.push(listing_row(index, source, &md));
        }
    }

    std::fs::create_dir_all(&request.output)?;
    let path = request.output.join(metadata_listing_name(&run_stamp(&started)));
    write_catalog(std::fs::File::create(&path)?, &rows)?;
    log::info!("Listed {} of {} image(s) in {}", rows.len(), scanned, path.display());

    Ok(ListingReport {
        path,
        scanned,
        listed: rows.len(),
    })
}

fn listing_row(index: String, source: String, md: &RasterMetadata) -> MetadataRow {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(strip_html_wrapper)
            .unwrap_or_default()
    };
    MetadataRow {
        index,
        source,
        title: field(&md.title),
        tags: field(&md.tags),
        summary: field(&md.summary),
        description: field(&md.description),
        credits: field(&md.credits),
        use_limitations: field(&md.access_constraints),
    }
}
