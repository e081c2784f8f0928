//! # ealidar-core
//!
//! Tile resolution and download planning for Environment Agency survey LiDAR
//! archives.
//!
//! The survey publishes elevation products per 5 km Ordnance Survey quadrant
//! tile (`TQ28ne`), while its catalog is queried per 10 km cell (`TQ28`).
//! This crate turns an area of interest into the set of archives to fetch:
//!
//! 1. Resolve which grid tiles the AOI covers, using an R-tree over the tile
//!    layer and an exact intersection test ([`GridIndex`], [`resolve`]).
//! 2. Normalize the tile ids and reduce them to distinct catalog keys
//!    ([`TileId`], [`reduce`]).
//! 3. Query the catalog once per key and keep the archives of the requested
//!    product whose names match a requested tile ([`PlanBuilder`]).
//! 4. Fetch the archives concurrently, one `Result` per task
//!    ([`FetchExecutor`]).
//!
//! ## Examples
//!
//! ### Whole 10 km tile
//!
//! ```no_run
//! use ealidar_core::{pipeline, Config, FetchExecutor, HttpCatalog};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let catalog = HttpCatalog::new(config.catalog.clone())?;
//!
//! let tiles = pipeline::tiles_by_id("TQ28")?;
//! let plan = pipeline::plan_downloads(
//!     &catalog,
//!     &tiles,
//!     "LIDAR-DTM-1M-ENGLAND-EA",
//!     Path::new("lidar"),
//!     config.catalog.on_error,
//! )?;
//!
//! let executor = FetchExecutor::new(&config.fetch)?;
//! for result in executor.execute(&plan.tasks) {
//!     if let Err(e) = result {
//!         eprintln!("{}", e);
//!     }
//! }
//! # Ok::<(), ealidar_core::Error>(())
//! ```
//!
//! ### Area of interest
//!
//! ```no_run
//! use ealidar_core::{pipeline, ResolverConfig};
//! use std::path::Path;
//!
//! let tiles = pipeline::tiles_by_polygon(
//!     Path::new("OS_5km_grid.geojson"),
//!     Path::new("catchment.geojson"),
//!     &ResolverConfig::default(),
//! )?;
//! for tile in &tiles {
//!     println!("{}", tile);
//! }
//! # Ok::<(), ealidar_core::Error>(())
//! ```

pub mod catalog;
pub mod config;
mod error;
pub mod features;
pub mod fetch;
pub mod geometry;
pub mod grid;
pub mod pipeline;
pub mod plan;
pub mod resolver;
pub mod tile_id;

pub use catalog::{reduce, Catalog, CatalogEntry, HttpCatalog};
pub use config::{CatalogConfig, Config, FetchConfig, ResolverConfig};
pub use error::{CatalogError, DataError, Error, FetchError, ValidationError};
pub use features::{Feature, DEFAULT_TILE_NAME_FIELD};
pub use fetch::{DownloadStats, FetchExecutor, FetchOutcome, FetchSummary};
pub use geometry::{Contact, Envelope, Footprint};
pub use grid::{GridIndex, GridTile};
pub use plan::{CatalogErrorPolicy, DownloadPlan, DownloadTask, PlanBuilder, SkippedKey};
pub use resolver::{resolve, BoundaryRule};
pub use tile_id::{CoarseKey, Quadrant, TileId};

/// Result type for tile resolution and planning.
pub type Result<T> = std::result::Result<T, Error>;
