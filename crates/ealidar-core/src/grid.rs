//! Spatial index over the named tiles of a grid layer.

use crate::geometry::{Envelope, Footprint};
use crate::DataError;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

/// A named cell of the national grid.
#[derive(Debug, Clone)]
pub struct GridTile<G> {
    name: String,
    geometry: G,
}

impl<G> GridTile<G> {
    /// Create a tile from its name and polygon.
    pub fn new(name: impl Into<String>, geometry: G) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Tile name as supplied by the layer (e.g. `TQ28NE`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tile polygon.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }
}

/// R-tree entry: a row id and the tile's bounding box.
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    id: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Bounding-box index over a tile layer.
///
/// Tiles are addressed by their row id (position in the layer). Queries
/// over-approximate: every tile whose bounding box overlaps the query box is
/// returned, and the exact geometry test is left to the caller.
///
/// The index is immutable once built.
#[derive(Debug)]
pub struct GridIndex<G> {
    tiles: Vec<GridTile<G>>,
    tree: RTree<IndexEntry>,
}

impl<G: Footprint> GridIndex<G> {
    /// Build the index, inserting each tile's bounding box under its row id.
    ///
    /// `origin` labels the layer in error messages.
    pub fn build(tiles: Vec<GridTile<G>>, origin: &str) -> Result<Self, DataError> {
        if tiles.is_empty() {
            return Err(DataError::EmptyLayer {
                origin: origin.to_string(),
            });
        }

        let entries = tiles
            .iter()
            .enumerate()
            .map(|(id, tile)| {
                let envelope = tile.geometry.bounding_box().ok_or_else(|| DataError::EmptyGeometry {
                    label: tile.name.clone(),
                })?;
                Ok(IndexEntry {
                    id,
                    envelope: envelope.to_aabb(),
                })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let tree = RTree::bulk_load(entries);
        debug!("indexed {} tiles from {}", tree.size(), origin);

        Ok(Self { tiles, tree })
    }

    /// Row ids of every tile whose bounding box overlaps `bbox`, in ascending order.
    pub fn query(&self, bbox: &Envelope) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&bbox.to_aabb())
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a tile by row id.
    pub fn tile(&self, id: usize) -> Option<&GridTile<G>> {
        self.tiles.get(id)
    }

    /// Number of indexed tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Bounding box covering the whole layer.
    pub fn total_bounds(&self) -> Option<Envelope> {
        if self.tree.size() == 0 {
            return None;
        }
        let envelope = self.tree.root().envelope();
        let [min_x, min_y] = envelope.lower();
        let [max_x, max_y] = envelope.upper();
        Some(Envelope::new(min_x, min_y, max_x, max_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Polygon, Rect};

    fn cell(name: &str, x: f64, y: f64) -> GridTile<Polygon<f64>> {
        GridTile::new(name, Rect::new((x, y), (x + 5000.0, y + 5000.0)).to_polygon())
    }

    fn tq28() -> Vec<GridTile<Polygon<f64>>> {
        vec![
            cell("TQ28NE", 525000.0, 185000.0),
            cell("TQ28SE", 525000.0, 180000.0),
            cell("TQ28SW", 520000.0, 180000.0),
            cell("TQ28NW", 520000.0, 185000.0),
        ]
    }

    #[test]
    fn test_build_and_query() {
        let index = GridIndex::build(tq28(), "tq28").unwrap();
        assert_eq!(index.len(), 4);

        // Box inside the north-east quadrant only
        let ids = index.query(&Envelope::new(526000.0, 186000.0, 527000.0, 187000.0));
        assert_eq!(ids, vec![0]);
        assert_eq!(index.tile(0).unwrap().name(), "TQ28NE");

        // Box over the centre point touches every quadrant's box
        let ids = index.query(&Envelope::new(524000.0, 184000.0, 526000.0, 186000.0));
        assert_eq!(ids, vec![0, 1, 2, 3]);

        // Box well outside
        assert!(index
            .query(&Envelope::new(600000.0, 100000.0, 601000.0, 101000.0))
            .is_empty());
    }

    #[test]
    fn test_empty_layer_rejected() {
        let err = GridIndex::<Polygon<f64>>::build(Vec::new(), "empty.geojson").unwrap_err();
        assert!(matches!(err, DataError::EmptyLayer { .. }));
    }

    #[test]
    fn test_empty_geometry_rejected() {
        let tiles = vec![GridTile::new("TQ28NE", MultiPolygon::<f64>::new(vec![]))];
        let err = GridIndex::build(tiles, "broken").unwrap_err();
        assert!(matches!(err, DataError::EmptyGeometry { ref label } if label == "TQ28NE"));
    }

    #[test]
    fn test_total_bounds() {
        let index = GridIndex::build(tq28(), "tq28").unwrap();
        let bounds = index.total_bounds().unwrap();
        assert_eq!(bounds, Envelope::new(520000.0, 180000.0, 530000.0, 190000.0));
    }
}
