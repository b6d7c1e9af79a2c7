//! Descriptive metadata propagation.
//!
//! A catalog row's six descriptive fields are written onto a raster's metadata,
//! together with the raster's current extent:
//!
//! | Catalog column | Metadata field |
//! |---|---|
//! | title | `title` |
//! | tags | `tags` |
//! | summary | `summary` |
//! | description | `description` |
//! | credits | `credits` |
//! | Use limitations | `access_constraints` |
//!
//! Existing fields not named above (display scales) are kept. Targets whose
//! metadata is read-only are left untouched.
//!
//! ## HTML wrappers
//!
//! Metadata edited in desktop GIS tools comes back wrapped in presentation
//! markup, e.g. `<DIV STYLE="text-align:Left;"><DIV><P><SPAN>Title</SPAN></P></DIV></DIV>`.
//! [`strip_html_wrapper`] removes those fixed wrappers before values are
//! reported or exported.

use crate::catalog::{MetadataCatalog, MetadataRow};
use crate::engine::{Backends, EngineError, RasterMetadata};
use std::path::Path;

const HTML_WRAPPERS: &[&str] = &[
    r#"<DIV STYLE="text-align:Left;"><DIV><P><SPAN>"#,
    r#"<DIV STYLE="text-align:Left;"><DIV><DIV><P><SPAN>"#,
    "</SPAN></P></DIV></DIV>",
    "</DIV>",
];

/// Remove the known HTML wrapper fragments.
///
/// Repeats until nothing changes, so stripping an already-stripped value is a
/// no-op even when removing one fragment joins the pieces of another.
pub fn strip_html_wrapper(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = HTML_WRAPPERS
            .iter()
            .fold(current.clone(), |acc, wrapper| acc.replace(wrapper, ""));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Overlay a catalog row onto existing metadata.
pub fn merge_row(
    existing: RasterMetadata,
    row: &MetadataRow,
    extent: Option<String>,
) -> RasterMetadata {
    RasterMetadata {
        title: Some(row.title.clone()),
        tags: Some(row.tags.clone()),
        summary: Some(row.summary.clone()),
        description: Some(row.description.clone()),
        credits: Some(row.credits.clone()),
        access_constraints: Some(row.use_limitations.clone()),
        extent: extent.or(existing.extent),
        ..existing
    }
}

/// Write a catalog row onto `target`'s metadata.
///
/// Returns `false` when the target's metadata is read-only and nothing was
/// written.
pub fn apply(
    backends: &Backends<'_>,
    target: &Path,
    row: &MetadataRow,
) -> Result<bool, EngineError> {
    if backends.metadata.is_read_only(target)? {
        log::debug!("Metadata of {} is read-only, skipped", target.display());
        return Ok(false);
    }
    let extent = match backends.raster.extent(target) {
        Ok(extent) => Some(extent.to_string()),
        Err(e) => {
            log::debug!("No extent for {}: {}", target.display(), e);
            None
        }
    };
    let existing = backends.metadata.read(target)?;
    backends
        .metadata
        .write(target, &merge_row(existing, row, extent))?;
    Ok(true)
}

/// Apply the catalog row for `source`, if any, to the source and its derivative.
pub fn propagate(
    backends: &Backends<'_>,
    catalog: &MetadataCatalog,
    source: &Path,
    derivative: &Path,
) -> Result<(), EngineError> {
    let Some(row) = catalog.lookup(source) else {
        return Ok(());
    };
    apply(backends, source, row)?;
    apply(backends, derivative, row)?;
    Ok(())
}

/// Whether any descriptive field is missing or empty.
///
/// Fields are compared after [`strip_html_wrapper`], so a field holding only
/// an empty editor wrapper counts as empty and the raster is listed.
pub fn is_incomplete(md: &RasterMetadata) -> bool {
    [
        &md.title,
        &md.tags,
        &md.summary,
        &md.description,
        &md.credits,
        &md.access_constraints,
    ]
    .iter()
    .any(|field| {
        field
            .as_deref()
            .map(strip_html_wrapper)
            .is_none_or(|s| s.is_empty())
    })
}
