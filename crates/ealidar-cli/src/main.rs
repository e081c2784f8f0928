//! `ealidar`: resolve survey LiDAR tiles for a tile id or an area of interest
//! and download the matching archives.

use clap::{Args, Parser, Subcommand};
use ealidar_core::{pipeline, Config, FetchExecutor, FetchSummary, HttpCatalog, TileId, ValidationError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ealidar", author, version, about = "Environment Agency LiDAR tile downloader")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parallel downloads (overrides fetch.workers)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Log filter, e.g. "debug" or "ealidar_core=trace" (defaults to RUST_LOG, then info)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a 10 km tile (all four quadrants) or a single quadrant
    Tile {
        /// Tile id, e.g. TQ28 or TQ28ne
        #[arg(long)]
        id: String,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Download every tile intersecting an area of interest
    Polygon {
        /// GeoJSON grid layer with a tile name property
        #[arg(long)]
        tiles: PathBuf,

        /// GeoJSON polygon layer in the same CRS as the grid
        #[arg(long)]
        aoi: PathBuf,

        #[command(flatten)]
        download: DownloadArgs,
    },

    /// Print the tiles intersecting an area of interest
    Resolve {
        /// GeoJSON grid layer with a tile name property
        #[arg(long)]
        tiles: PathBuf,

        /// GeoJSON polygon layer in the same CRS as the grid
        #[arg(long)]
        aoi: PathBuf,
    },

    /// Print the product families published for a tile
    Products {
        /// Tile id, e.g. TQ28
        #[arg(long)]
        id: String,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Product family, e.g. LIDAR-DTM-1M-ENGLAND-EA
    #[arg(long)]
    product: String,

    /// Output folder
    #[arg(long)]
    out: PathBuf,

    /// Print the download plan without fetching
    #[arg(long)]
    dry_run: bool,

    /// Create the output folder if missing
    #[arg(long)]
    create_out: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match &cli.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ealidar_core::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }

    match cli.command {
        Command::Tile { id, download: args } => {
            let tiles = pipeline::tiles_by_id(&id)?;
            download(&config, &tiles, &args)
        }
        Command::Polygon { tiles, aoi, download: args } => {
            let ids = pipeline::tiles_by_polygon(&tiles, &aoi, &config.resolver)?;
            if ids.is_empty() {
                warn!("no tiles intersect {}", aoi.display());
            }
            download(&config, &ids, &args)
        }
        Command::Resolve { tiles, aoi } => {
            for id in pipeline::tiles_by_polygon(&tiles, &aoi, &config.resolver)? {
                println!("{}", id);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Products { id } => {
            let catalog = HttpCatalog::new(config.catalog.clone())?;
            for product in pipeline::list_products(&catalog, &id)? {
                println!("{}", product);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn download(config: &Config, tiles: &[TileId], args: &DownloadArgs) -> ealidar_core::Result<ExitCode> {
    if args.create_out {
        create_output_dir(&args.out)?;
    }

    let catalog = HttpCatalog::new(config.catalog.clone())?;
    let plan = pipeline::plan_downloads(&catalog, tiles, &args.product, &args.out, config.catalog.on_error)?;

    for skipped in &plan.skipped {
        warn!("catalog unavailable for {}: {}", skipped.key, skipped.reason);
    }
    if plan.tasks.is_empty() {
        warn!("no {} archives found for {} tiles", args.product, tiles.len());
    }

    if args.dry_run {
        for task in &plan.tasks {
            println!("{}\t{}", task.url, task.destination.display());
        }
        return Ok(exit_code(plan.is_complete()));
    }

    let executor = FetchExecutor::new(&config.fetch)?;
    info!("fetching {} archives with {} workers", plan.tasks.len(), executor.workers());
    let results = executor.execute(&plan.tasks);

    for (task, result) in plan.tasks.iter().zip(&results) {
        if let Err(e) = result {
            error!("{} not downloaded: {}", task.tile, e);
        }
    }

    let summary = FetchSummary::from_results(&results);
    let stats = executor.download_stats();
    info!(
        "{} archives ({} bytes) written to {}",
        stats.archives_downloaded,
        stats.bytes_downloaded,
        args.out.display()
    );
    Ok(exit_code(summary.is_success() && plan.is_complete()))
}

fn create_output_dir(path: &Path) -> Result<(), ValidationError> {
    std::fs::create_dir_all(path).map_err(|e| ValidationError::OutputDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
