//! CLI output formatting.
//!
//! Log lines (`RUST_LOG`, `-v`) narrate a run file by file; the summaries here
//! are what the operator reads once it is done.
//!
//! ## Load
//!
//! ```text
//! Reduced images: /data/county-1987_Reduced_Images_v2
//! Workspace:      /out/county-1987_19102026_14h05min09.gdb
//!
//! Mosaics
//! 001 MosaicDataset_NAD83_12images (NAD83)
//!     12 added
//! 002 MosaicDataset_WGS_1984_Web_Mercator__auxiliary_sphere__3images (WGS 1984 Web Mercator (auxiliary sphere))
//!     2 added, 1 failed
//!
//! Audit log: /out/log_19102026_14h05min09.csv
//! Processed 17 images: 14 succeeded, 3 failed
//! ```
//!
//! ## List metadata
//!
//! ```text
//! Listing:  /out/NoMetadataImages_19102026_14h05min09.csv
//! Listed 4 of 17 images
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::listing::ListingReport;
use crate::mosaic::MosaicSummary;
use crate::process::RunReport;

/// Format a positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn mosaic_lines(pos: usize, mosaic: &MosaicSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({})",
        format_index(pos),
        mosaic.name,
        mosaic.crs
    )];
    let detail = match (mosaic.path.is_some(), mosaic.failed) {
        (false, _) => "    not created".to_string(),
        (true, 0) => format!("    {} added", mosaic.added),
        (true, failed) => format!("    {} added, {} failed", mosaic.added, failed),
    };
    lines.push(detail);
    lines
}

/// Format the summary of a load run.
pub fn format_run_summary(report: &RunReport) -> Vec<String> {
    let mut lines = vec![format!("Reduced images: {}", report.reduced_root.display())];
    if let Some(workspace) = &report.workspace {
        lines.push(format!("Workspace:      {}", workspace.display()));
    }

    if !report.mosaics.is_empty() {
        lines.push(String::new());
        lines.push("Mosaics".to_string());
        for (i, mosaic) in report.mosaics.iter().enumerate() {
            lines.extend(mosaic_lines(i + 1, mosaic));
        }
    }

    lines.push(String::new());
    lines.push(format!("Audit log: {}", report.audit_path.display()));
    lines.push(format!(
        "Processed {}: {} succeeded, {} failed",
        plural(report.total, "image"),
        report.succeeded,
        report.failed
    ));
    lines
}

pub fn print_run_summary(report: &RunReport) {
    for line in format_run_summary(report) {
        println!("{}", line);
    }
}

/// Format the summary of a metadata listing.
pub fn format_listing_summary(report: &ListingReport) -> Vec<String> {
    vec![
        format!("Listing:  {}", report.path.display()),
        format!("Listed {} of {}", report.listed, plural(report.scanned, "image")),
    ]
}

pub fn print_listing_summary(report: &ListingReport) {
    for line in format_listing_summary(report) {
        println!("{}", line);
    }
}
