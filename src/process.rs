//! The load pipeline.
//!
//! Drives one run from source folder to audit log:
//!
//! ```text
//! enumerate ──► classify ──┬─ Staged ───────► group by CRS ──► one mosaic per group
//!                          ├─ Unreferenced ─► downsize + metadata, FAILED row
//!                          └─ Failed ───────► FAILED row
//!                                                  │
//!                                   log_<stamp>.csv ◄┘
//! ```
//!
//! ## Outputs
//!
//! ```text
//! surveys/
//! ├── county-1987/                        # source (untouched apart from metadata,
//! │                                       #  world files and .prj for resolved images)
//! ├── county-1987_Reduced_Images_v0/      # JPEG derivatives, mirrored layout
//! └── out/
//!     ├── county-1987_19102026_14h05min09.gdb/
//!     │   ├── MosaicDataset_NAD83_12images.json
//!     │   └── MosaicDataset_WGS_1984_Web_Mercator__auxiliary_sphere__3images.json
//!     └── log_19102026_14h05min09.csv
//! ```
//!
//! Every enumerated raster gets exactly one audit row. Per-file problems never
//! stop the run; only an unusable source or output folder does.

use crate::audit::{AuditEntry, AuditLog, Status};
use crate::catalog::MetadataCatalog;
use crate::classify::{CrsClassifier, Disposition};
use crate::config::LoaderConfig;
use crate::engine::{
    Backends, CrsStatus, EngineError, FileGeodatabase, Quality, RustEngine, SidecarMetadataStore,
};
use crate::georef::{GeoreferenceFields, GeoreferenceResolver};
use crate::group::group_by_crs;
use crate::metadata;
use crate::mosaic::{MosaicAssembler, MosaicSummary};
use crate::naming::{audit_log_name, run_stamp, workspace_name};
use crate::reduce::ReducedImageFactory;
use crate::scan::raster_files;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audit log could not be written: {0}")]
    Audit(#[from] csv::Error),
    #[error("Source folder not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Where georeferencing data comes from.
#[derive(Debug, Clone)]
pub struct GeoreferenceOptions {
    pub table: PathBuf,
    pub fields: GeoreferenceFields,
}

/// Per-run settings taken from `loader.toml`.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub quality: Quality,
    pub extensions: Vec<String>,
}

impl LoadOptions {
    pub fn from_loader_config(config: &LoaderConfig) -> Self {
        Self {
            quality: Quality::new(config.images.quality),
            extensions: config.images.extensions.clone(),
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from_loader_config(&LoaderConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub metadata_csv: Option<PathBuf>,
    /// `None` disables georeferencing.
    pub georeference: Option<GeoreferenceOptions>,
    pub options: LoadOptions,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub reduced_root: PathBuf,
    pub workspace: Option<PathBuf>,
    pub mosaics: Vec<MosaicSummary>,
    pub audit_path: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Run the pipeline with the production collaborators.
pub fn run(request: &LoadRequest, started: DateTime<Local>) -> Result<RunReport, ProcessError> {
    let engine = RustEngine::new();
    let store = SidecarMetadataStore::new();
    let gdb = FileGeodatabase::new();
    let backends = Backends {
        raster: &engine,
        metadata: &store,
        mosaics: &gdb,
    };
    run_with_backends(&backends, request, started)
}

/// Run the pipeline against any set of collaborators (allows testing with mock).
pub fn run_with_backends(
    backends: &Backends<'_>,
    request: &LoadRequest,
    started: DateTime<Local>,
) -> Result<RunReport, ProcessError> {
    let source = request
        .source
        .canonicalize()
        .map_err(|_| ProcessError::SourceNotFound(request.source.clone()))?;
    if !source.is_dir() {
        return Err(ProcessError::SourceNotFound(request.source.clone()));
    }
    std::fs::create_dir_all(&request.output)?;

    let stamp = run_stamp(&started);
    let root_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let catalog = MetadataCatalog::load_or_empty(request.metadata_csv.as_deref());
    let resolver = request
        .georeference
        .as_ref()
        .map(|g| GeoreferenceResolver::open(&g.table, g.fields.clone()));
    let factory = ReducedImageFactory::prepare(&source, request.options.quality)?;

    log::info!("Loading rasters from {}", source.display());
    let classifier = CrsClassifier::new(*backends, resolver.as_ref());
    let mut audit = AuditLog::new();
    let mut staged = Vec::new();

    for path in raster_files(&source, &request.options.extensions) {
        log::info!("Checking {}", path.display());
        match classifier.classify(&path) {
            Disposition::Staged(image) => staged.push(image),
            Disposition::Unreferenced { path, reason } => {
                let entry = match downsize_unreferenced(backends, &factory, &catalog, &path) {
                    Ok(derivative) => AuditEntry::failed(&path, reason)
                        .with_derivative(&derivative)
                        .with_crs(CrsStatus::Unknown.name()),
                    Err(e) => AuditEntry::failed(&path, e.to_string())
                        .with_crs(CrsStatus::Unknown.name()),
                };
                audit.record(backends, entry);
            }
            Disposition::Failed { path, error } => {
                let entry = AuditEntry::failed(&path, error).with_crs(CrsStatus::Unknown.name());
                audit.record(backends, entry);
            }
        }
    }

    let groups = group_by_crs(staged);
    let mut assembler = MosaicAssembler::new(
        *backends,
        &factory,
        &catalog,
        &request.output,
        workspace_name(&root_name, &stamp),
    );
    let mosaics: Vec<MosaicSummary> = groups
        .iter()
        .map(|group| assembler.assemble(group, &mut audit))
        .collect();

    let audit_path = request.output.join(audit_log_name(&stamp));
    audit.save(&audit_path)?;
    log::info!("Wrote {} audit row(s) to {}", audit.len(), audit_path.display());

    Ok(RunReport {
        reduced_root: factory.reduced_root().to_path_buf(),
        workspace: assembler.workspace().map(Path::to_path_buf),
        mosaics,
        audit_path,
        total: audit.len(),
        succeeded: audit.count(Status::Success),
        failed: audit.count(Status::Failed),
    })
}

fn downsize_unreferenced(
    backends: &Backends<'_>,
    factory: &ReducedImageFactory,
    catalog: &MetadataCatalog,
    source: &Path,
) -> Result<PathBuf, EngineError> {
    let derivative = factory.convert(backends, source)?;
    metadata::propagate(backends, catalog, source, &derivative)?;
    Ok(derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::{started, write_attribute_csv, write_metadata_csv};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        source: PathBuf,
        output: PathBuf,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("county-1987");
        for file in files {
            let path = source.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "raster").unwrap();
        }
        fs::create_dir_all(&source).unwrap();
        let source = source.canonicalize().unwrap();
        Fixture {
            output: tmp.path().join("out"),
            tmp,
            source,
        }
    }

    fn request(fx: &Fixture) -> LoadRequest {
        LoadRequest {
            source: fx.source.clone(),
            output: fx.output.clone(),
            metadata_csv: None,
            georeference: None,
            options: LoadOptions::default(),
        }
    }

    fn audit_lines(report: &RunReport) -> Vec<Vec<String>> {
        fs::read_to_string(&report.audit_path)
            .unwrap()
            .lines()
            .skip(1)
            .map(|l| l.split('|').map(str::to_string).collect())
            .collect()
    }

    // =========================================================================
    // LoadOptions
    // =========================================================================

    #[test]
    fn load_options_default_values() {
        let options = LoadOptions::default();
        assert_eq!(options.quality.value(), 75);
        assert!(options.extensions.contains(&"tif".to_string()));
        assert!(options.extensions.contains(&"jp2".to_string()));
    }

    // =========================================================================
    // run_with_backends
    // =========================================================================

    #[test]
    fn every_recognized_file_gets_one_row() {
        let fx = fixture(&["a.tif", "sub/b.tif", "sub/c.jp2", "readme.txt", "a.tfw"]);
        let backend = MockBackend::new()
            .with_crs("a.tif", CrsStatus::Known("NAD83".into()))
            .failing_describe("c.jp2");

        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        assert_eq!(report.total, 3);
        assert_eq!((report.succeeded, report.failed), (1, 2));
        assert_eq!(audit_lines(&report).len(), 3);
    }

    #[test]
    fn describe_failure_is_logged_under_unknown_crs() {
        let fx = fixture(&["c.jp2"]);
        let backend = MockBackend::new().failing_describe("c.jp2");

        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        let rows = audit_lines(&report);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], "");
        assert_eq!(rows[0][6], "Unknown");
        assert_eq!(rows[0][18], "FAILED");
        assert!(rows[0][19].contains("Cannot describe c.jp2"));
    }

    #[test]
    fn audit_log_is_named_after_the_run() {
        let fx = fixture(&[]);
        let backend = MockBackend::new();
        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        assert_eq!(report.audit_path, fx.output.join("log_19102026_14h05min09.csv"));
        assert_eq!(report.total, 0);
        assert!(report.mosaics.is_empty());
        assert!(report.workspace.is_none());
    }

    #[test]
    fn known_crs_groups_become_mosaics() {
        let fx = fixture(&["a.tif", "b.tif", "c.tif"]);
        let backend = MockBackend::new()
            .with_crs("a.tif", CrsStatus::Known("NAD83".into()))
            .with_crs("b.tif", CrsStatus::Known("NAD27".into()))
            .with_crs("c.tif", CrsStatus::Known("NAD83".into()));

        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        let names: Vec<&str> = report.mosaics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["MosaicDataset_NAD27_1images", "MosaicDataset_NAD83_2images"]
        );
        assert_eq!(
            report.workspace,
            Some(fx.output.join("county-1987_19102026_14h05min09.gdb"))
        );
        assert_eq!(
            report.reduced_root,
            fx.tmp.path().canonicalize().unwrap().join("county-1987_Reduced_Images_v0")
        );
        assert_eq!(report.succeeded, 3);
    }

    #[test]
    fn unreferenced_images_are_downsized_but_failed() {
        let fx = fixture(&["untagged.tif"]);
        let backend = MockBackend::new();

        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        let derivative = report.reduced_root.join("untagged.jpg");
        assert!(derivative.exists());
        let rows = audit_lines(&report);
        assert_eq!(rows[0][3], derivative.to_string_lossy());
        assert_eq!(rows[0][5], "");
        assert_eq!(rows[0][6], "Unknown");
        assert_eq!(rows[0][18], "FAILED");
        assert_eq!(rows[0][19], "Downsized but not georeferenced");
        assert!(report.mosaics.is_empty());
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::CreateWorkspace(_)))
        );
    }

    #[test]
    fn unreferenced_conversion_failure_is_recorded() {
        let fx = fixture(&["untagged.tif"]);
        let backend = MockBackend::new().failing_copy("untagged.tif");

        let report = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        let rows = audit_lines(&report);
        assert_eq!(rows[0][3], "");
        assert_eq!(rows[0][19], "Processing failed: Cannot convert untagged.tif");
    }

    #[test]
    fn georeferenced_image_joins_web_mercator_mosaic() {
        let fx = fixture(&["scan_01.tif", "scan_02.tif"]);
        let table = write_attribute_csv(
            fx.tmp.path(),
            "PATH,FLT_DIR,SCALE,X,Y\nphotos/scan_01.tif,NS,10000,100000,200000\n",
        );
        let mut req = request(&fx);
        req.georeference = Some(GeoreferenceOptions {
            table,
            fields: GeoreferenceFields::default(),
        });
        let backend = MockBackend::new();

        let report = run_with_backends(&backend.backends(), &req, started()).unwrap();

        assert_eq!(
            fs::read_to_string(fx.source.join("scan_01.tfw")).unwrap(),
            "0.172\n0\n0\n-0.172\n98400\n201600\n"
        );
        assert_eq!(report.mosaics.len(), 1);
        assert_eq!(
            report.mosaics[0].name,
            "MosaicDataset_WGS_1984_Web_Mercator__auxiliary_sphere__1images"
        );
        let rows = audit_lines(&report);
        // scan_02 is recorded during classification, before any mosaic row.
        assert_eq!(rows[0][1], fx.source.join("scan_02.tif").to_string_lossy());
        assert_eq!(rows[0][19], "No referencing Info for this image in the SHP");
        assert_eq!(rows[1][18], "SUCCESS");
    }

    #[test]
    fn unreadable_table_fails_each_unknown_image() {
        let fx = fixture(&["a.tif"]);
        let mut req = request(&fx);
        req.georeference = Some(GeoreferenceOptions {
            table: fx.tmp.path().join("missing.shp"),
            fields: GeoreferenceFields::default(),
        });
        let backend = MockBackend::new();

        let report = run_with_backends(&backend.backends(), &req, started()).unwrap();

        let rows = audit_lines(&report);
        assert!(rows[0][19].starts_with("Attribute table could not be opened"));
        assert!(report.reduced_root.join("a.jpg").exists());
    }

    #[test]
    fn metadata_is_applied_to_unreferenced_derivatives() {
        let fx = fixture(&["a.tif"]);
        let csv = write_metadata_csv(
            fx.tmp.path(),
            &[(fx.source.join("a.tif").as_path(), "Frame A")],
        );
        let mut req = request(&fx);
        req.metadata_csv = Some(csv);
        let backend = MockBackend::new();

        let report = run_with_backends(&backend.backends(), &req, started()).unwrap();

        let md = backend
            .metadata_of(&report.reduced_root.join("a.jpg"))
            .unwrap();
        assert_eq!(md.title.as_deref(), Some("Frame A"));
        assert_eq!(audit_lines(&report)[0][10], "Frame A");
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let req = LoadRequest {
            source: tmp.path().join("nope"),
            output: tmp.path().join("out"),
            metadata_csv: None,
            georeference: None,
            options: LoadOptions::default(),
        };
        let backend = MockBackend::new();
        let err = run_with_backends(&backend.backends(), &req, started()).unwrap_err();
        assert!(matches!(err, ProcessError::SourceNotFound(_)));
    }

    #[test]
    fn second_run_uses_next_version() {
        let fx = fixture(&["a.tif"]);
        let backend = MockBackend::new();
        let first = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();
        let second = run_with_backends(&backend.backends(), &request(&fx), started()).unwrap();

        assert!(first.reduced_root.ends_with("county-1987_Reduced_Images_v0"));
        assert!(second.reduced_root.ends_with("county-1987_Reduced_Images_v1"));
    }
}
