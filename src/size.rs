//! Human-readable file sizes for the audit log.
//!
//! A raster on disk is rarely a single file: world files, `.prj` projections
//! and metadata sidecars travel with it. [`raster_size`] reports the footprint
//! of the whole family, which is what an operator cares about when checking
//! how much a reduction saved.

use std::path::Path;

const SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with two decimals, e.g. `1536` → `"1.50 KB"`.
pub fn format_size(bytes: u64) -> String {
    format_size_with_precision(bytes, 2)
}

/// Format a byte count, dividing by 1024 while the value is strictly above 1024.
pub fn format_size_with_precision(bytes: u64, precision: usize) -> String {
    let mut size = bytes as f64;
    let mut suffix = 0;
    while size > 1024.0 && suffix < SUFFIXES.len() - 1 {
        suffix += 1;
        size /= 1024.0;
    }
    format!("{:.*} {}", precision, size, SUFFIXES[suffix])
}

/// Total size of a raster and every sibling sharing its base name.
///
/// The base name is everything before the first `.`, so `a.tif`, `a.tfw`,
/// `a.prj` and `a.tif.metadata.json` all count towards `a.tif`.
pub fn raster_size(raster: &Path) -> std::io::Result<u64> {
    let file_name = raster
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = base_name(&file_name);
    let dir = match raster.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut total = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = entry.metadata()?;
        if meta.is_file() && base_name(&name) == base {
            total += meta.len();
        }
    }
    Ok(total)
}

fn base_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn bytes_stay_in_bytes() {
        assert_eq!(format_size(0), "0.00 B");
        assert_eq!(format_size(512), "512.00 B");
    }

    #[test]
    fn exactly_1024_is_not_promoted() {
        assert_eq!(format_size(1024), "1024.00 B");
    }

    #[test]
    fn kilobytes_and_megabytes() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 1), "5.00 MB");
    }

    #[test]
    fn terabytes_is_the_ceiling() {
        let petabyte = 1024u64.pow(5) * 3;
        assert_eq!(format_size(petabyte), "3072.00 TB");
    }

    #[test]
    fn custom_precision() {
        assert_eq!(format_size_with_precision(1536, 1), "1.5 KB");
    }

    #[test]
    fn raster_size_counts_sidecars() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("scan.tif"), vec![0u8; 100]).unwrap();
        fs::write(tmp.path().join("scan.tfw"), vec![0u8; 10]).unwrap();
        fs::write(tmp.path().join("scan.tif.metadata.json"), vec![0u8; 5]).unwrap();
        fs::write(tmp.path().join("other.tif"), vec![0u8; 1000]).unwrap();

        assert_eq!(raster_size(&tmp.path().join("scan.tif")).unwrap(), 115);
    }

    #[test]
    fn raster_size_missing_directory_errors() {
        assert!(raster_size(Path::new("/nonexistent/dir/scan.tif")).is_err());
    }
}
