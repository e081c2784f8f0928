//! Resolution of an area of interest to the grid tiles it covers.
//!
//! For every AOI polygon the grid index is queried with the polygon's
//! bounding box, then each candidate is tested against the exact geometry.
//! Results from all polygons are unioned, so a tile touched by several
//! polygons is reported once.

use crate::geometry::{Contact, Footprint};
use crate::grid::GridIndex;
use crate::tile_id::TileId;
use crate::{DataError, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Whether a tile that only shares boundary with the AOI is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryRule {
    /// Only tiles with a non-empty areal overlap are selected.
    #[default]
    Exclude,
    /// Any common point selects the tile, edges and corners included.
    Include,
}

impl BoundaryRule {
    /// Decide whether a contact selects the tile.
    pub fn accepts(self, contact: Contact) -> bool {
        match contact {
            Contact::Interior => true,
            Contact::Boundary => self == BoundaryRule::Include,
            Contact::Disjoint => false,
        }
    }
}

/// Names of every tile that intersects at least one AOI polygon.
pub fn resolve<G: Footprint>(
    aoi: &[G],
    index: &GridIndex<G>,
    rule: BoundaryRule,
) -> std::result::Result<BTreeSet<String>, DataError> {
    if aoi.is_empty() {
        return Err(DataError::EmptyLayer {
            origin: "area of interest".to_string(),
        });
    }

    let mut names = BTreeSet::new();

    for (n, polygon) in aoi.iter().enumerate() {
        let bbox = polygon.bounding_box().ok_or_else(|| DataError::EmptyGeometry {
            label: format!("area of interest #{n}"),
        })?;

        let candidates = index.query(&bbox);
        let mut selected = 0;

        for id in &candidates {
            let tile = index.tile(*id).ok_or_else(|| DataError::EmptyGeometry {
                label: format!("tile row {id}"),
            })?;
            if rule.accepts(tile.geometry().contact(polygon)) {
                names.insert(tile.name().to_string());
                selected += 1;
            }
        }

        debug!(
            "aoi polygon {}: {} candidates, {} intersecting",
            n,
            candidates.len(),
            selected
        );
    }

    Ok(names)
}

/// Resolve the AOI and parse every tile name as a fine (quadrant) id.
///
/// Fails if the tile layer names a cell that is not a 6-character id.
pub fn resolve_fine_ids<G: Footprint>(
    aoi: &[G],
    index: &GridIndex<G>,
    rule: BoundaryRule,
) -> Result<BTreeSet<TileId>> {
    let mut ids = BTreeSet::new();
    for name in resolve(aoi, index, rule)? {
        let id = TileId::parse(&name)?;
        if !id.is_fine() {
            return Err(ValidationError::NotFine(name).into());
        }
        ids.insert(id);
    }
    Ok(ids)
}
