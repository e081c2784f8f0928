//! Bounding boxes and the geometry capability used by the grid index and resolver.

use geo::{BoundingRect, Intersects, MultiPolygon, Polygon, Rect, Relate};
use rstar::AABB;

/// Axis-aligned bounding box in layer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Minimum x (west edge).
    pub min_x: f64,
    /// Minimum y (south edge).
    pub min_y: f64,
    /// Maximum x (east edge).
    pub max_x: f64,
    /// Maximum y (north edge).
    pub max_y: f64,
}

impl Envelope {
    /// Create an envelope from two corners in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Check whether two envelopes overlap. Shared edges count as overlap.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub(crate) fn to_aabb(self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

impl From<Rect<f64>> for Envelope {
    fn from(rect: Rect<f64>) -> Self {
        Envelope::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// How two geometries meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// No common point.
    Disjoint,
    /// Boundaries meet but interiors do not (shared edge or corner).
    Boundary,
    /// Interiors share a non-empty area.
    Interior,
}

/// The geometry capability the grid index and resolver rely on.
///
/// Any polygonal representation can take part in tile resolution by
/// reporting its bounding box and classifying its contact with another
/// geometry of the same kind.
pub trait Footprint {
    /// Bounding box, or `None` for an empty geometry.
    fn bounding_box(&self) -> Option<Envelope>;

    /// Exact contact classification against another geometry.
    fn contact(&self, other: &Self) -> Contact;
}

impl Footprint for MultiPolygon<f64> {
    fn bounding_box(&self) -> Option<Envelope> {
        self.bounding_rect().map(Envelope::from)
    }

    fn contact(&self, other: &Self) -> Contact {
        if !self.intersects(other) {
            return Contact::Disjoint;
        }
        if self.relate(other).is_touches() {
            Contact::Boundary
        } else {
            Contact::Interior
        }
    }
}

impl Footprint for Polygon<f64> {
    fn bounding_box(&self) -> Option<Envelope> {
        self.bounding_rect().map(Envelope::from)
    }

    fn contact(&self, other: &Self) -> Contact {
        if !self.intersects(other) {
            return Contact::Disjoint;
        }
        if self.relate(other).is_touches() {
            Contact::Boundary
        } else {
            Contact::Interior
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new((x, y), (x + size, y + size)).to_polygon()
    }

    #[test]
    fn test_envelope_intersects() {
        let a = Envelope::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Envelope::new(5.0, 5.0, 15.0, 15.0)));
        // Shared edge
        assert!(a.intersects(&Envelope::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Envelope::new(10.5, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn test_envelope_normalises_corners() {
        let e = Envelope::new(10.0, 8.0, 2.0, 4.0);
        assert_eq!(e, Envelope::new(2.0, 4.0, 10.0, 8.0));
        assert!(e.intersects(&Envelope::new(5.0, 5.0, 5.0, 5.0)));
        assert!(!e.intersects(&Envelope::new(1.0, 5.0, 1.0, 5.0)));
    }

    #[test]
    fn test_bounding_box() {
        let tri = polygon![(x: 1.0, y: 2.0), (x: 5.0, y: 3.0), (x: 2.0, y: 7.0)];
        assert_eq!(tri.bounding_box(), Some(Envelope::new(1.0, 2.0, 5.0, 7.0)));
        assert_eq!(MultiPolygon::<f64>::new(vec![]).bounding_box(), None);
    }

    #[test]
    fn test_contact_classification() {
        let tile = square(0.0, 0.0, 10.0);
        assert_eq!(tile.contact(&square(5.0, 5.0, 10.0)), Contact::Interior);
        assert_eq!(tile.contact(&square(10.0, 0.0, 10.0)), Contact::Boundary);
        assert_eq!(tile.contact(&square(10.0, 10.0, 10.0)), Contact::Boundary);
        assert_eq!(tile.contact(&square(11.0, 0.0, 10.0)), Contact::Disjoint);
        // Fully contained
        assert_eq!(tile.contact(&square(2.0, 2.0, 1.0)), Contact::Interior);
    }

    #[test]
    fn test_multipolygon_contact() {
        let tile = MultiPolygon::new(vec![square(0.0, 0.0, 10.0)]);
        let aoi = MultiPolygon::new(vec![square(20.0, 20.0, 5.0), square(8.0, 8.0, 1.0)]);
        assert_eq!(tile.contact(&aoi), Contact::Interior);

        let neighbour = MultiPolygon::new(vec![square(0.0, 10.0, 10.0)]);
        assert_eq!(tile.contact(&neighbour), Contact::Boundary);
    }
}
