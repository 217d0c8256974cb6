use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Rect};
use rstar::RTree;

use crate::geom::bbox::{point_envelope, BoundingBox};

/// Geometries represents an indexed collection of MultiPolygons, queried by point.
#[derive(Debug, Clone, Default)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty MultiPolygons are kept (to preserve indices) but never indexed.
    pub(crate) fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Indices of every MultiPolygon touching `coord` (interior or boundary), ascending.
    pub(crate) fn locate_all(&self, coord: Coord<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self.rtree
            .locate_in_envelope_intersecting(&point_envelope(coord))
            .map(BoundingBox::idx)
            .filter(|&idx| self.shapes[idx].intersects(&coord))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Index of the first MultiPolygon touching `coord`, in insertion order.
    /// R-tree traversal order is unspecified, so the minimum is taken explicitly.
    pub(crate) fn locate(&self, coord: Coord<f64>) -> Option<usize> {
        self.rtree
            .locate_in_envelope_intersecting(&point_envelope(coord))
            .map(BoundingBox::idx)
            .filter(|&idx| self.shapes[idx].intersects(&coord))
            .min()
    }

    /// Compute the bounding rectangle of all indexed MultiPolygons.
    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        self.rtree.iter()
            .map(|b| *b.bbox())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, polygon};

    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn locate_inside_and_outside() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 1.0), square(2.0, 0.0, 1.0)]);
        assert_eq!(geoms.locate(coord! { x: 0.5, y: 0.5 }), Some(0));
        assert_eq!(geoms.locate(coord! { x: 2.5, y: 0.5 }), Some(1));
        assert_eq!(geoms.locate(coord! { x: 1.5, y: 0.5 }), None);
        assert_eq!(geoms.locate(coord! { x: -10.0, y: 0.5 }), None);
    }

    #[test]
    fn overlap_resolves_to_lowest_index() {
        let geoms = Geometries::new(vec![square(1.0, 1.0, 2.0), square(0.0, 0.0, 2.0), square(1.5, 1.5, 0.1)]);
        let c = coord! { x: 1.55, y: 1.55 };
        assert_eq!(geoms.locate_all(c), vec![0, 1, 2]);
        assert_eq!(geoms.locate(c), Some(0));
    }

    #[test]
    fn bounding_box_hit_is_not_enough() {
        // L-shaped polygon: the notch lies inside the bounding box but outside the shape.
        let l_shape = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]]);
        let geoms = Geometries::new(vec![l_shape]);
        assert_eq!(geoms.locate(coord! { x: 0.5, y: 1.5 }), Some(0));
        assert_eq!(geoms.locate(coord! { x: 1.5, y: 1.5 }), None);
    }

    #[test]
    fn empty_collection() {
        let geoms = Geometries::new(Vec::new());
        assert!(geoms.shapes().is_empty());
        assert_eq!(geoms.locate(coord! { x: 0.0, y: 0.0 }), None);
        assert!(geoms.bounds().is_none());
    }

    #[test]
    fn bounds_cover_all_shapes() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 1.0), square(4.0, -2.0, 1.0)]);
        let b = geoms.bounds().unwrap();
        assert_eq!(b.min(), coord! { x: 0.0, y: -2.0 });
        assert_eq!(b.max(), coord! { x: 5.0, y: 1.0 });
        assert_eq!(geoms.shapes().len(), 2);
    }
}
