//! Entry points tying the modules together.
//!
//! Two ways to pick tiles (a polygon layer or a named tile id) feed the same
//! planning step:
//!
//! ```text
//! tile layer + AOI ──► GridIndex ──► resolve ──┐
//!                                              ├─► reduce ──► PlanBuilder ──► FetchExecutor
//! tile id ────────────► tiles_for_request ─────┘
//! ```

use crate::catalog::{self, Catalog};
use crate::config::ResolverConfig;
use crate::features::{geometries, read_geojson, tiles_from_features};
use crate::grid::GridIndex;
use crate::plan::{CatalogErrorPolicy, DownloadPlan, PlanBuilder};
use crate::resolver::resolve_fine_ids;
use crate::tile_id::{tiles_for_request, TileId};
use crate::{DataError, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Fine tile ids of the grid layer that intersect the AOI layer.
///
/// Both layers are GeoJSON polygon sources in the same planar CRS. The
/// result is sorted and free of duplicates.
pub fn tiles_by_polygon(tile_layer: &Path, aoi: &Path, config: &ResolverConfig) -> Result<Vec<TileId>> {
    let origin = tile_layer.display().to_string();
    let tiles = tiles_from_features(read_geojson(tile_layer)?, &config.tile_name_field)?;
    let index = GridIndex::build(tiles, &origin)?;

    let aoi_features = read_geojson(aoi)?;
    if aoi_features.is_empty() {
        return Err(DataError::EmptyLayer {
            origin: aoi.display().to_string(),
        }
        .into());
    }
    let polygons = geometries(aoi_features);

    let ids = resolve_fine_ids(&polygons, &index, config.boundary)?;
    info!(
        "{} of {} tiles intersect {} aoi polygons",
        ids.len(),
        index.len(),
        polygons.len()
    );
    Ok(ids.into_iter().collect())
}

/// Fine tile ids for a named tile: four quadrants for a 4-character id, the
/// id itself for a 6-character one.
pub fn tiles_by_id(id: &str) -> Result<Vec<TileId>> {
    Ok(tiles_for_request(id)?)
}

/// Build the download plan for a set of tiles.
pub fn plan_downloads<C: Catalog + ?Sized>(
    catalog: &C,
    tiles: &[TileId],
    product: &str,
    output_dir: &Path,
    on_catalog_error: CatalogErrorPolicy,
) -> Result<DownloadPlan> {
    PlanBuilder::new(catalog, product, output_dir)
        .on_catalog_error(on_catalog_error)
        .build_for(tiles)
}

/// Product families published for the 10 km cell containing `id`.
pub fn list_products<C: Catalog + ?Sized>(catalog: &C, id: &str) -> Result<BTreeSet<String>> {
    let key = TileId::parse(id)?.coarse_key();
    Ok(catalog::list_products(catalog, &key)?)
}
