use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{bail, Result};
use geo::{Coord, MultiPolygon, Rect};

use crate::geom::{Crs, Geometries};
use super::municipality::{Municipality, MunicipalityId};

/// The loaded set of municipality polygons, indexed for point lookup.
/// Geometries are stored in the map CRS.
#[derive(Debug, Clone)]
pub struct MunicipalityLayer {
    crs: Crs,
    entities: Vec<Municipality>,
    by_name: AHashMap<Arc<str>, MunicipalityId>, // First occurrence wins on duplicate names.
    geoms: Geometries,
}

impl MunicipalityLayer {
    /// Build a layer from parallel lists of attributes and geometries (already in `crs`).
    pub(crate) fn new(crs: Crs, entities: Vec<Municipality>, shapes: Vec<MultiPolygon<f64>>) -> Result<Self> {
        if entities.len() != shapes.len() {
            bail!("Entity count ({}) does not match geometry count ({})", entities.len(), shapes.len());
        }
        if let Some((i, e)) = entities.iter().enumerate().find(|(i, e)| e.id.index() != *i) {
            bail!("Entity at position {i} carries out-of-order id {}", e.id);
        }

        let mut by_name = AHashMap::with_capacity(entities.len());
        for e in &entities {
            by_name.entry(e.name.clone()).or_insert(e.id);
        }

        Ok(Self { crs, entities, by_name, geoms: Geometries::new(shapes) })
    }

    /// A layer with no municipalities: every lookup returns none.
    pub fn empty(crs: Crs) -> Self {
        Self { crs, entities: Vec::new(), by_name: AHashMap::new(), geoms: Geometries::default() }
    }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    #[inline] pub fn len(&self) -> usize { self.entities.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    #[inline] pub fn municipalities(&self) -> &[Municipality] { &self.entities }

    #[inline]
    pub fn get(&self, id: MunicipalityId) -> Option<&Municipality> {
        self.entities.get(id.index())
    }

    #[inline]
    pub fn geometry(&self, id: MunicipalityId) -> Option<&MultiPolygon<f64>> {
        self.geoms.shapes().get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&Municipality> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    /// The municipality whose polygon contains `coord` (map CRS), if any.
    /// Boundary points count as inside. When polygons overlap, the one that
    /// appears first in the dataset wins.
    pub fn find_municipality(&self, coord: Coord<f64>) -> Option<&Municipality> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return None;
        }
        self.geoms.locate(coord).map(|idx| &self.entities[idx])
    }

    /// Every municipality whose polygon contains `coord`, in dataset order.
    pub fn find_all(&self, coord: Coord<f64>) -> Vec<&Municipality> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Vec::new();
        }
        self.geoms.locate_all(coord).into_iter().map(|idx| &self.entities[idx]).collect()
    }

    /// Extent of all municipality polygons.
    #[inline]
    pub fn bounds(&self) -> Option<Rect<f64>> { self.geoms.bounds() }
}

#[cfg(test)]
mod tests {
    use geo::{coord, polygon};

    use crate::municipality::UrbanFlag;
    use super::*;

    fn entity(idx: u32, name: &str, code: &str) -> Municipality {
        Municipality {
            id: MunicipalityId(idx),
            name: name.into(),
            area_km2: 1.0,
            type_code: code.into(),
            urban: UrbanFlag::classify(code, "D"),
        }
    }

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn layer() -> MunicipalityLayer {
        MunicipalityLayer::new(
            Crs::WebMercator,
            vec![entity(0, "A", "D"), entity(1, "B", "N"), entity(2, "A", "N")],
            vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0), square(100.0, 100.0, 1.0)],
        ).unwrap()
    }

    #[test]
    fn lookup_hits_and_misses() {
        let layer = layer();
        assert_eq!(layer.find_municipality(coord! { x: 5.0, y: 5.0 }).map(|m| m.id), Some(MunicipalityId(0)));
        assert_eq!(layer.find_municipality(coord! { x: 15.0, y: 5.0 }).map(|m| m.id), Some(MunicipalityId(1)));
        assert!(layer.find_municipality(coord! { x: 50.0, y: 50.0 }).is_none());
        assert!(layer.find_municipality(coord! { x: f64::NAN, y: 5.0 }).is_none());
    }

    #[test]
    fn shared_edge_resolves_to_first() {
        let layer = layer();
        let edge = coord! { x: 10.0, y: 5.0 };
        let all: Vec<_> = layer.find_all(edge).iter().map(|m| m.id).collect();
        assert_eq!(all, vec![MunicipalityId(0), MunicipalityId(1)]);
        assert_eq!(layer.find_municipality(edge).map(|m| m.id), Some(MunicipalityId(0)));
    }

    #[test]
    fn duplicate_names_keep_first() {
        let layer = layer();
        assert_eq!(layer.by_name("A").map(|m| m.id), Some(MunicipalityId(0)));
        assert!(layer.by_name("Z").is_none());
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        assert!(MunicipalityLayer::new(Crs::WebMercator, vec![entity(0, "A", "D")], Vec::new()).is_err());
        assert!(MunicipalityLayer::new(Crs::WebMercator, vec![entity(3, "A", "D")], vec![square(0.0, 0.0, 1.0)]).is_err());
    }

    #[test]
    fn empty_layer_never_matches() {
        let layer = MunicipalityLayer::empty(Crs::WebMercator);
        assert!(layer.is_empty());
        assert!(layer.find_municipality(coord! { x: 0.0, y: 0.0 }).is_none());
        assert!(layer.bounds().is_none());
    }
}
