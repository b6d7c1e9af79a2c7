use clap::{Parser, Subcommand};
use imagery_loader::georef::GeoreferenceFields;
use imagery_loader::listing::{self, ListingRequest};
use imagery_loader::process::{self, GeoreferenceOptions, LoadOptions, LoadRequest};
use imagery_loader::{config, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "imagery-loader")]
#[command(about = "Batch loader for reduced geospatial imagery")]
#[command(long_about = "\
Batch loader for reduced geospatial imagery

Converts every raster under a source folder into a reduced JPEG, groups the
results by coordinate system into mosaic datasets, and writes an audit log
with one row per image.

Layout after a run:

  surveys/
  ├── county-1987/                      # source folder (loader.toml optional)
  │   └── 1987/flight-3/f3_0042.tif
  ├── county-1987_Reduced_Images_v0/    # mirrored JPEG derivatives
  │   └── 1987/flight-3/f3_0042.jpg
  └── out/
      ├── county-1987_<stamp>.gdb/      # one mosaic dataset per CRS
      └── log_<stamp>.csv               # pipe-delimited audit log

Images without a spatial reference can be georeferenced from a point
attribute table (shapefile or CSV) keyed by image name, flight direction and
scale. Descriptive metadata comes from a ';' CSV; 'list-metadata' writes a
starter file for it.

Run 'imagery-loader gen-config' to generate a documented loader.toml.")]
#[command(version)]
struct Cli {
    /// Log per-file detail (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Attribute-table options for synthetic georeferencing.
#[derive(clap::Args, Clone)]
struct GeoreferenceArgs {
    /// Georeference rasters that have no spatial reference
    #[arg(long, requires = "table")]
    georeference: bool,

    /// Point attribute table (.shp or .csv)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Field holding the image path
    #[arg(long, default_value = "PATH")]
    path_field: String,

    /// Field holding the flight direction (NS or EW)
    #[arg(long, default_value = "FLT_DIR")]
    flt_dir_field: String,

    /// Field holding the scale
    #[arg(long, default_value = "SCALE")]
    scale_field: String,
}

impl GeoreferenceArgs {
    fn options(&self) -> Option<GeoreferenceOptions> {
        if !self.georeference {
            return None;
        }
        let table = self.table.clone()?;
        Some(GeoreferenceOptions {
            table,
            fields: GeoreferenceFields {
                path: self.path_field.clone(),
                flight_direction: self.flt_dir_field.clone(),
                scale: self.scale_field.clone(),
            },
        })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Reduce, georeference and mosaic every raster under SOURCE
    Load {
        /// Source image folder
        source: PathBuf,
        /// Folder for the workspace and audit log
        output: PathBuf,
        /// Semicolon-delimited metadata CSV
        metadata_csv: Option<PathBuf>,
        #[command(flatten)]
        georef: GeoreferenceArgs,
        /// Config file (default: SOURCE/loader.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List rasters whose descriptive metadata is incomplete
    ListMetadata {
        /// Source image folder
        source: PathBuf,
        /// Folder for the listing
        output: PathBuf,
        /// List every raster with empty fields, without reading metadata
        #[arg(long)]
        blank: bool,
        /// Config file (default: SOURCE/loader.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock loader.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Load {
            source,
            output: output_dir,
            metadata_csv,
            georef,
            config: config_path,
        } => {
            let config = config::load_config(&source, config_path.as_deref())?;
            config::init_thread_pool(&config.processing);
            let request = LoadRequest {
                source,
                output: output_dir,
                metadata_csv,
                georeference: georef.options(),
                options: LoadOptions::from_loader_config(&config),
            };
            let report = process::run(&request, chrono::Local::now())?;
            output::print_run_summary(&report);
        }
        Command::ListMetadata {
            source,
            output: output_dir,
            blank,
            config: config_path,
        } => {
            let config = config::load_config(&source, config_path.as_deref())?;
            let request = ListingRequest {
                source: resolve_source(&source)?,
                output: output_dir,
                blank,
                extensions: config.images.extensions,
            };
            let report = listing::generate(&request, chrono::Local::now())?;
            output::print_listing_summary(&report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `info` by default, `debug` with `-v`; `RUST_LOG` takes precedence.
fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

/// Absolute source folder, so listed paths match what `load` enumerates.
fn resolve_source(source: &Path) -> std::io::Result<PathBuf> {
    source.canonicalize()
}
