use anyhow::{anyhow, bail, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};

/// Parse a GeoJSON geometry object into a MultiPolygon.
/// Polygons are lifted to a one-element MultiPolygon; other geometry types yield `None`.
pub(crate) fn parse_areal_geometry(geometry: &Value) -> Result<Option<MultiPolygon<f64>>> {
    let coords = || geometry["coordinates"].as_array()
        .ok_or_else(|| anyhow!("geometry has no coordinates array"));

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(Some(MultiPolygon(vec![parse_polygon_coords(coords()?)?]))),
        Some("MultiPolygon") => {
            let polygons = coords()?.iter()
                .map(|polygon| {
                    let rings = polygon.as_array()
                        .ok_or_else(|| anyhow!("MultiPolygon member must be an array of rings"))?;
                    parse_polygon_coords(rings)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(MultiPolygon(polygons)))
        }
        _ => Ok(None),
    }
}

/// Parse GeoJSON Polygon coordinates: [exterior, hole, hole, ...].
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        let ring = ring.as_array().ok_or_else(|| anyhow!("ring must be an array of positions"))?;
        parse_ring_coords(ring)
    });

    let exterior = rings.next()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring (exterior or interior) from GeoJSON coordinates.
/// Format: [[x, y], [x, y], ...]
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = Vec::with_capacity(coords.len() + 1);

    for position in coords {
        let position = position.as_array()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| anyhow!("Invalid position: expected [x, y]"))?;
        let x = position[0].as_f64()
            .ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = position[1].as_f64()
            .ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        points.push(Coord { x, y });
    }

    if points.len() < 3 {
        bail!("Invalid ring: expected at least 3 positions, found {}", points.len());
    }

    // Ensure ring is closed (first point == last point)
    if points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }

    Ok(LineString(points))
}

/// Convert a MultiPolygon to a serde_json::Value representing a GeoJSON geometry.
pub(crate) fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.coords().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = mp.0.iter()
        .map(|polygon| std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .map(ring)
            .collect())
        .collect();

    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}
