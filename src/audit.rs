//! The run's audit log.
//!
//! One row per enumerated raster, written at the end of the run as a
//! pipe-delimited CSV (`log_<stamp>.csv` in the output folder):
//!
//! | Column | Source |
//! |---|---|
//! | index | 1-based, in recording order |
//! | source file location / size | the source raster and its sidecars |
//! | new file location / size | the JPEG derivative, if one was produced |
//! | mosaic dataset name | empty unless the image was added |
//! | output coordinate system | group CRS, or `Unknown` |
//! | start / end / duration | wall-clock timing of mosaic loading |
//! | title … Use limitations | the source's metadata, wrappers stripped |
//! | extent / scale range | the source's extent and display scale range |
//! | status / error detail | `SUCCESS` or `FAILED` with the reason |
//!
//! Rows that never reached a mosaic carry empty timestamps and a `0 sec`
//! duration. Snapshot fields that cannot be read come out empty; recording a
//! row never fails.

use crate::engine::Backends;
use crate::metadata::strip_html_wrapper;
use crate::size::{format_size, raster_size};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const AUDIT_DELIMITER: u8 = b'|';

pub const AUDIT_HEADER: [&str; 20] = [
    "index",
    "source file location",
    "source file size",
    "new file location",
    "new file size",
    "mosaic dataset name",
    "output coordinate system",
    "start",
    "end",
    "duration",
    "title",
    "tags",
    "summary",
    "description",
    "credits",
    "Use limitations",
    "extent",
    "scale range",
    "status",
    "error detail",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl Timing {
    /// From `start` until now.
    pub fn since(start: DateTime<Local>) -> Self {
        Self {
            start,
            end: Local::now(),
        }
    }

    pub fn duration_text(&self) -> String {
        let seconds = (self.end - self.start).num_milliseconds() as f64 / 1000.0;
        format!("{seconds:.2} sec")
    }
}

/// What the pipeline knows about one raster's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub source: PathBuf,
    pub derivative: Option<PathBuf>,
    pub mosaic: String,
    pub crs: String,
    pub timing: Option<Timing>,
    pub status: Status,
    pub detail: String,
}

impl AuditEntry {
    pub fn success(
        source: &Path,
        derivative: &Path,
        mosaic: &str,
        crs: &str,
        timing: Timing,
    ) -> Self {
        Self {
            source: source.to_path_buf(),
            derivative: Some(derivative.to_path_buf()),
            mosaic: mosaic.to_string(),
            crs: crs.to_string(),
            timing: Some(timing),
            status: Status::Success,
            detail: String::new(),
        }
    }

    pub fn failed(source: &Path, detail: impl Into<String>) -> Self {
        Self {
            source: source.to_path_buf(),
            derivative: None,
            mosaic: String::new(),
            crs: String::new(),
            timing: None,
            status: Status::Failed,
            detail: detail.into(),
        }
    }

    pub fn with_derivative(mut self, derivative: &Path) -> Self {
        self.derivative = Some(derivative.to_path_buf());
        self
    }

    pub fn with_crs(mut self, crs: &str) -> Self {
        self.crs = crs.to_string();
        self
    }
}

/// One written line of the audit CSV, in [`AUDIT_HEADER`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRow {
    pub index: usize,
    pub source: String,
    pub source_size: String,
    pub derivative: String,
    pub derivative_size: String,
    pub mosaic: String,
    pub crs: String,
    pub start: String,
    pub end: String,
    pub duration: String,
    pub title: String,
    pub tags: String,
    pub summary: String,
    pub description: String,
    pub credits: String,
    pub use_limitations: String,
    pub extent: String,
    pub scale_range: String,
    pub status: Status,
    pub detail: String,
}

#[derive(Debug, Default)]
struct Snapshot {
    title: String,
    tags: String,
    summary: String,
    description: String,
    credits: String,
    use_limitations: String,
    extent: String,
    scale_range: String,
}

fn snapshot(backends: &Backends<'_>, source: &Path) -> Snapshot {
    let extent = backends
        .raster
        .extent(source)
        .map(|e| e.to_string())
        .unwrap_or_default();
    let md = match backends.metadata.read(source) {
        Ok(md) => md,
        Err(e) => {
            log::debug!("No metadata snapshot for {}: {}", source.display(), e);
            return Snapshot {
                extent,
                ..Default::default()
            };
        }
    };
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(strip_html_wrapper)
            .unwrap_or_default()
    };
    Snapshot {
        title: field(&md.title),
        tags: field(&md.tags),
        summary: field(&md.summary),
        description: field(&md.description),
        credits: field(&md.credits),
        use_limitations: field(&md.access_constraints),
        extent,
        scale_range: scale_range(md.min_scale, md.max_scale),
    }
}

/// `min-max`, with either side blank when unset; empty when neither is.
pub fn scale_range(min: Option<f64>, max: Option<f64>) -> String {
    if min.is_none() && max.is_none() {
        return String::new();
    }
    let side = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    format!("{}-{}", side(min), side(max))
}

fn size_text(path: Option<&Path>) -> String {
    path.and_then(|p| raster_size(p).ok())
        .map(format_size)
        .unwrap_or_default()
}

/// Append-only audit rows for one run.
#[derive(Debug, Default)]
pub struct AuditLog {
    rows: Vec<AuditRow>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the source and append a row for `entry`.
    pub fn record(&mut self, backends: &Backends<'_>, entry: AuditEntry) {
        match entry.status {
            Status::Success => log::info!("Loaded {}", entry.source.display()),
            Status::Failed => log::warn!("{}: {}", entry.source.display(), entry.detail),
        }

        let snap = snapshot(backends, &entry.source);
        let (start, end, duration) = match entry.timing {
            Some(t) => (
                t.start.format(TIME_FORMAT).to_string(),
                t.end.format(TIME_FORMAT).to_string(),
                t.duration_text(),
            ),
            None => (String::new(), String::new(), "0 sec".to_string()),
        };

        self.rows.push(AuditRow {
            index: self.rows.len() + 1,
            source: entry.source.to_string_lossy().into_owned(),
            source_size: size_text(Some(entry.source.as_path())),
            derivative: entry
                .derivative
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            derivative_size: size_text(entry.derivative.as_deref()),
            mosaic: entry.mosaic,
            crs: entry.crs,
            start,
            end,
            duration,
            title: snap.title,
            tags: snap.tags,
            summary: snap.summary,
            description: snap.description,
            credits: snap.credits,
            use_limitations: snap.use_limitations,
            extent: snap.extent,
            scale_range: snap.scale_range,
            status: entry.status,
            detail: entry.detail,
        });
    }

    pub fn rows(&self) -> &[AuditRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn count(&self, status: Status) -> usize {
        self.rows.iter().filter(|r| r.status == status).count()
    }

    /// Write the header and every row as pipe-delimited CSV.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(AUDIT_DELIMITER)
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(AUDIT_HEADER)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }
}
