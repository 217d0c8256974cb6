use std::{path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::geom::Crs;

/// Settings for a map session. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Initial view center, in `map_crs`.
    pub map_center: [f64; 2],
    pub zoom: u8,
    /// CRS of the coordinates stored in the dataset.
    pub data_crs: Crs,
    /// CRS of the map view; clicks and positions arrive in this CRS.
    pub map_crs: Crs,
    /// Type code marking an urban ("mestna") municipality.
    pub urban_code: String,
    pub name_key: String,
    pub area_key: String,
    pub type_key: String,
    pub animation_period_ms: u64,
    pub marker_max_radius: u32,
    pub marker_min_radius: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            map_center: [1655360.12, 5793576.89],
            zoom: 9,
            data_crs: Crs::Wgs84,
            map_crs: Crs::WebMercator,
            urban_code: "D".to_string(),
            name_key: "OB_UIME".to_string(),
            area_key: "POV_KM2".to_string(),
            type_key: "OB_TIP".to_string(),
            animation_period_ms: 250,
            marker_max_radius: 12,
            marker_min_radius: 3,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse session config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.animation_period_ms == 0 {
            bail!("animation_period_ms must be positive");
        }
        if self.marker_max_radius <= self.marker_min_radius {
            bail!(
                "marker radii must span at least two steps (max {} <= min {})",
                self.marker_max_radius, self.marker_min_radius
            );
        }
        if self.map_center.iter().any(|v| !v.is_finite()) {
            bail!("map_center must be finite");
        }
        Ok(())
    }

    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord { x: self.map_center[0], y: self.map_center[1] }
    }

    #[inline]
    pub fn animation_period(&self) -> Duration {
        Duration::from_millis(self.animation_period_ms)
    }
}
