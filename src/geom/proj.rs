use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coordinate reference systems understood by the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Geographic lon/lat in degrees (EPSG:4326).
    Wgs84,
    /// Spherical (Web) Mercator in meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    #[inline]
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    #[inline]
    pub fn is_geographic(self) -> bool { matches!(self, Crs::Wgs84) }

    /// PROJ.4 definition for this CRS (degrees → radians handled in code).
    #[inline]
    fn proj4(self) -> &'static str {
        match self {
            Crs::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
            Crs::WebMercator => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +units=m +no_defs +type=crs",
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = anyhow::Error;

    /// Accepts "EPSG:3857", "epsg:4326" or a bare code.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("epsg:"))
            .map_or(trimmed, |_| &trimmed[5..]);
        let code: u32 = code.parse()
            .with_context(|| format!("invalid CRS identifier {s:?}"))?;
        Crs::from_epsg(code).ok_or_else(|| anyhow!("unsupported CRS {s:?}; expected EPSG:4326 or EPSG:3857"))
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reprojects coordinates between two CRSs.
pub struct Projector {
    from: Crs,
    to: Crs,
    src: Proj4,
    dst: Proj4,
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projector").field("from", &self.from).field("to", &self.to).finish()
    }
}

impl Projector {
    pub fn new(from: Crs, to: Crs) -> Result<Self> {
        let build = |crs: Crs| {
            Proj4::from_proj_string(crs.proj4())
                .with_context(|| anyhow!("failed to build PROJ.4 for {crs}: {}", crs.proj4()))
        };
        Ok(Self { from, to, src: build(from)?, dst: build(to)? })
    }

    /// Reproject a single coordinate. Geographic coordinates are in degrees.
    pub fn project(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if self.from == self.to {
            return Ok(coord);
        }
        if !coord.x.is_finite() || !coord.y.is_finite() {
            bail!("cannot reproject non-finite coordinate ({}, {})", coord.x, coord.y);
        }

        let mut point = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.src, &self.dst, &mut point)
            .map_err(|e| anyhow!("{} → {} transform failed for ({}, {}): {e:?}", self.from, self.to, coord.x, coord.y))?;

        Ok(if self.to.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Reproject every vertex of a MultiPolygon.
    pub fn project_shape(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        if self.from == self.to {
            return Ok(shape.clone());
        }
        shape.try_map_coords(|coord| self.project(coord))
    }
}
