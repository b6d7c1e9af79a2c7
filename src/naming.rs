//! Naming conventions for everything a run writes to disk.
//!
//! ## Versioned reduced-images folder
//!
//! Reduced JPEGs land in a sibling of the source folder named
//! `<root>_Reduced_Images_v<N>`. Every run picks a fresh `N` so earlier outputs
//! are never overwritten:
//!
//! ```text
//! surveys/
//! ├── county-1987/                        # source folder (root = "county-1987")
//! ├── county-1987_Reduced_Images_v0/      # first run
//! └── county-1987_Reduced_Images_v1/      # second run
//! ```
//!
//! [`next_version`] is a pure function over the sibling names so the rule can
//! be tested without touching the filesystem.
//!
//! ## Run artifacts
//!
//! | Artifact | Name |
//! |---|---|
//! | Mosaic container | `<root>_<ddmmyyyy_HHhMMminSS>.gdb` |
//! | Mosaic dataset | `MosaicDataset_<sanitized CRS>_<count>images` |
//! | Audit log | `log_<ddmmyyyy_HHhMMminSS>.csv` |
//! | Metadata listing | `NoMetadataImages_<ddmmyyyy_HHhMMminSS>.csv` |

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

const REDUCED_MARKER: &str = "_Reduced_Images_v";

/// Timestamp format shared by every run artifact, e.g. `19102026_14h05min09`.
pub const STAMP_FORMAT: &str = "%d%m%Y_%Hh%Mmin%S";

/// Format a run timestamp for use in file names.
pub fn run_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format(STAMP_FORMAT).to_string()
}

/// Name of the reduced-images folder for a given version.
pub fn reduced_folder_name(root_name: &str, version: u32) -> String {
    format!("{root_name}{REDUCED_MARKER}{version}")
}

/// Parse the version out of a `<root>_Reduced_Images_v<N>` folder name.
///
/// Returns `None` for folders that belong to a different root or have no
/// numeric suffix.
pub fn parse_reduced_version(root_name: &str, folder_name: &str) -> Option<u32> {
    let prefix = format!("{root_name}{REDUCED_MARKER}");
    let rest = folder_name.strip_prefix(&prefix)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Next free version given the names of the source folder's siblings.
///
/// `0` when no versioned folder exists yet, otherwise one past the highest.
pub fn next_version<S: AsRef<str>>(root_name: &str, sibling_names: &[S]) -> u32 {
    sibling_names
        .iter()
        .filter_map(|name| parse_reduced_version(root_name, name.as_ref()))
        .max()
        .map_or(0, |max| max + 1)
}

/// Replace every character that is not ASCII alphanumeric with `_`.
///
/// `WGS 1984 Web Mercator (auxiliary sphere)` →
/// `WGS_1984_Web_Mercator__auxiliary_sphere_`
pub fn sanitize_crs(crs_name: &str) -> String {
    crs_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Mosaic dataset name for a CRS group of `count` images.
pub fn mosaic_name(crs_name: &str, count: usize) -> String {
    format!("MosaicDataset_{}_{}images", sanitize_crs(crs_name), count)
}

/// Mosaic container name: `<root>_<stamp>.gdb`.
pub fn workspace_name(root_name: &str, stamp: &str) -> String {
    format!("{root_name}_{stamp}.gdb")
}

/// Audit log file name: `log_<stamp>.csv`.
pub fn audit_log_name(stamp: &str) -> String {
    format!("log_{stamp}.csv")
}

/// Metadata listing file name: `NoMetadataImages_<stamp>.csv`.
pub fn metadata_listing_name(stamp: &str) -> String {
    format!("NoMetadataImages_{stamp}.csv")
}
