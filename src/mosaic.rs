//! One mosaic dataset per CRS group.
//!
//! The workspace container is created on the first group and reused for the
//! rest of the run. Every member of a group ends up with exactly one audit row,
//! whether it was added, failed on its own, or was lost with its workspace or
//! mosaic.

use crate::audit::{AuditEntry, AuditLog, Timing};
use crate::catalog::MetadataCatalog;
use crate::engine::{Backends, EngineError, MosaicDefinition};
use crate::group::CrsGroup;
use crate::metadata;
use crate::naming::mosaic_name;
use crate::reduce::ReducedImageFactory;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Outcome of one group.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicSummary {
    pub name: String,
    pub crs: String,
    /// `None` when the mosaic could not be created.
    pub path: Option<PathBuf>,
    pub added: usize,
    pub failed: usize,
}

pub struct MosaicAssembler<'a> {
    backends: Backends<'a>,
    factory: &'a ReducedImageFactory,
    catalog: &'a MetadataCatalog,
    output_dir: PathBuf,
    workspace_name: String,
    workspace: Option<Result<PathBuf, String>>,
}

impl<'a> MosaicAssembler<'a> {
    pub fn new(
        backends: Backends<'a>,
        factory: &'a ReducedImageFactory,
        catalog: &'a MetadataCatalog,
        output_dir: &Path,
        workspace_name: String,
    ) -> Self {
        Self {
            backends,
            factory,
            catalog,
            output_dir: output_dir.to_path_buf(),
            workspace_name,
            workspace: None,
        }
    }

    /// The workspace, once one has been created.
    pub fn workspace(&self) -> Option<&Path> {
        match &self.workspace {
            Some(Ok(path)) => Some(path),
            _ => None,
        }
    }

    fn ensure_workspace(&mut self) -> Result<PathBuf, String> {
        let backends = self.backends;
        let (output_dir, name) = (&self.output_dir, &self.workspace_name);
        self.workspace
            .get_or_insert_with(|| {
                let created = backends
                    .mosaics
                    .create_workspace(output_dir, name)
                    .map_err(|e| e.to_string());
                match &created {
                    Ok(path) => log::info!("Created workspace {}", path.display()),
                    Err(e) => log::warn!("Workspace {name} could not be created: {e}"),
                }
                created
            })
            .clone()
    }

    /// Build the group's mosaic and record a row for every member.
    pub fn assemble(&mut self, group: &CrsGroup, log: &mut AuditLog) -> MosaicSummary {
        let name = mosaic_name(&group.crs, group.members.len());
        let mut summary = MosaicSummary {
            name: name.clone(),
            crs: group.crs.clone(),
            path: None,
            added: 0,
            failed: 0,
        };

        let mosaic = self.ensure_workspace().and_then(|workspace| {
            self.backends
                .mosaics
                .create_mosaic(&workspace, &MosaicDefinition::rgb(&name, &group.crs))
                .map_err(|e| e.to_string())
        });
        let mosaic = match mosaic {
            Ok(path) => path,
            Err(e) => {
                for member in &group.members {
                    log.record(&self.backends, AuditEntry::failed(member, &e).with_crs(&group.crs));
                }
                summary.failed = group.members.len();
                return summary;
            }
        };
        log::info!(
            "Created {} for {} image(s) in {}",
            name,
            group.members.len(),
            group.crs
        );

        for member in &group.members {
            let start = Local::now();
            match self.load_member(&mosaic, member) {
                Ok(derivative) => {
                    let entry = AuditEntry::success(
                        member,
                        &derivative,
                        &name,
                        &group.crs,
                        Timing::since(start),
                    );
                    log.record(&self.backends, entry);
                    summary.added += 1;
                }
                Err(e) => {
                    log.record(
                        &self.backends,
                        AuditEntry::failed(member, e.to_string()).with_crs(&group.crs),
                    );
                    summary.failed += 1;
                }
            }
        }
        summary.path = Some(mosaic);
        summary
    }

    fn load_member(&self, mosaic: &Path, source: &Path) -> Result<PathBuf, EngineError> {
        let derivative = self.factory.convert(&self.backends, source)?;
        metadata::propagate(&self.backends, self.catalog, source, &derivative)?;
        self.backends.mosaics.add_raster(mosaic, &derivative)?;
        Ok(derivative)
    }
}
