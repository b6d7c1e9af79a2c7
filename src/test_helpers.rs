//! Shared test utilities.
//!
//! Fixed run clock and small fixture writers used across module tests.

use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};

/// Run start used by tests that assert on stamped file names
/// (`19102026_14h05min09`).
pub fn started() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 10, 19, 14, 5, 9).unwrap()
}

/// Write a comma-delimited attribute table to `dir/table.csv`.
pub fn write_attribute_csv(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("table.csv");
    std::fs::write(&path, content).unwrap();
    path
}

/// Write a metadata CSV with a title for each source, in catalog order.
pub fn write_metadata_csv(dir: &Path, titles: &[(&Path, &str)]) -> PathBuf {
    let mut content = String::from(
        "index;source file location;title;tags;summary;description;credits;Use limitations\n",
    );
    for (i, (source, title)) in titles.iter().enumerate() {
        content.push_str(&format!(
            "{};{};{};tag;summary;description;credits;Public\n",
            i + 1,
            source.display(),
            title
        ));
    }
    let path = dir.join("metadata.csv");
    std::fs::write(&path, content).unwrap();
    path
}
