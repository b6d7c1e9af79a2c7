//! Source tree enumeration.
//!
//! Walks the source folder depth-first and yields every regular file whose
//! extension is in the configured raster list. The walk is lazy: callers pull
//! paths one at a time, so a tree with tens of thousands of scans never sits in
//! memory as a list. Each call to [`raster_files`] starts a fresh walk.
//!
//! Sibling sidecars (`.tfw`, `.prj`, `.xml`, `.metadata.json`) are not rasters and
//! are skipped by the extension filter, as is the tool's own `loader.toml`.
//!
//! Entries that cannot be read (permission denied, vanished mid-walk) are
//! logged and skipped. They were never attempted, so they don't appear in the
//! audit log.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily enumerate regular files under `root` with a recognized extension.
///
/// Entries are visited in file-name order within each directory, so repeated
/// runs over the same tree see the same sequence.
pub fn raster_files(root: &Path, extensions: &[String]) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(move |p| has_raster_extension(p, extensions))
}

/// Whether the path's extension is in the list (case-insensitive).
pub fn has_raster_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
}
