use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use geo::Coord;
use serde::Serialize;

use crate::{
    geom::{Crs, Projector},
    municipality::MunicipalityLayer,
};

/// Why the device position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// Geolocation is not available on this host, or an unknown error code.
    Unsupported,
}

impl GeolocationError {
    /// Map a browser `GeolocationPositionError.code`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Unsupported,
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GeolocationError::PermissionDenied => "permission denied",
            GeolocationError::PositionUnavailable => "position unavailable",
            GeolocationError::Timeout => "timed out waiting for a position fix",
            GeolocationError::Unsupported => "geolocation unsupported",
        })
    }
}

impl std::error::Error for GeolocationError {}

/// Which municipality, if any, the user is standing in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LocationStatus {
    Available {
        name: Arc<str>,
        /// Position in lon/lat degrees.
        lon: f64,
        lat: f64,
    },
    Outside,
    /// `None` until the first fix or error arrives.
    Unavailable { error: Option<GeolocationError> },
}

impl LocationStatus {
    #[inline]
    pub fn panel(&self) -> PanelKind {
        match self {
            LocationStatus::Available { .. } => PanelKind::Available,
            LocationStatus::Outside => PanelKind::Outside,
            LocationStatus::Unavailable { .. } => PanelKind::Unavailable,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            LocationStatus::Available { name, .. } => Some(name.as_ref()),
            _ => None,
        }
    }

    /// Latitude as shown in the status panel, e.g. `"46.05N"`.
    pub fn latitude_text(&self) -> Option<String> {
        match self {
            LocationStatus::Available { lat, .. } => Some(format!("{lat}N")),
            _ => None,
        }
    }

    /// Longitude as shown in the status panel, e.g. `"14.5E"`.
    pub fn longitude_text(&self) -> Option<String> {
        match self {
            LocationStatus::Available { lon, .. } => Some(format!("{lon}E")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Available,
    Outside,
    Unavailable,
}

impl PanelKind {
    pub const ALL: [PanelKind; 3] = [PanelKind::Available, PanelKind::Outside, PanelKind::Unavailable];
}

/// Visibility of the three status sub-panels. Built only from a status,
/// so exactly one flag is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPanel {
    available: bool,
    outside: bool,
    unavailable: bool,
}

impl StatusPanel {
    pub fn for_status(status: &LocationStatus) -> Self {
        let visible = status.panel();
        Self {
            available: visible == PanelKind::Available,
            outside: visible == PanelKind::Outside,
            unavailable: visible == PanelKind::Unavailable,
        }
    }

    #[inline] pub fn available(&self) -> bool { self.available }

    #[inline] pub fn outside(&self) -> bool { self.outside }

    #[inline] pub fn unavailable(&self) -> bool { self.unavailable }

    #[inline]
    pub fn is_visible(&self, kind: PanelKind) -> bool {
        match kind {
            PanelKind::Available => self.available,
            PanelKind::Outside => self.outside,
            PanelKind::Unavailable => self.unavailable,
        }
    }

    /// The single visible panel.
    pub fn visible(&self) -> PanelKind {
        if self.available {
            PanelKind::Available
        } else if self.outside {
            PanelKind::Outside
        } else {
            PanelKind::Unavailable
        }
    }
}

/// Tracks the user marker and the "which municipality am I in" status.
#[derive(Debug)]
pub struct LocationTracker {
    marker: Option<Coord<f64>>, // Map CRS
    status: LocationStatus,
    to_geographic: Projector,
}

impl LocationTracker {
    pub fn new(map_crs: Crs) -> Result<Self> {
        Ok(Self {
            marker: None,
            status: LocationStatus::Unavailable { error: None },
            to_geographic: Projector::new(map_crs, Crs::Wgs84)?,
        })
    }

    /// Current user marker position in map CRS, `None` when cleared.
    #[inline] pub fn marker(&self) -> Option<Coord<f64>> { self.marker }

    #[inline] pub fn status(&self) -> &LocationStatus { &self.status }

    #[inline] pub fn panel(&self) -> StatusPanel { StatusPanel::for_status(&self.status) }

    /// Handle a position change (map CRS). `None` means the fix was lost.
    /// Non-finite coordinates are treated as a lost fix.
    pub fn update_position(&mut self, layer: &MunicipalityLayer, position: Option<Coord<f64>>) -> Result<&LocationStatus> {
        let position = position.filter(|c| c.x.is_finite() && c.y.is_finite());
        self.marker = position;

        let found = position.and_then(|coord| layer.find_municipality(coord).map(|m| (coord, m)));
        let status = match found {
            Some((coord, municipality)) => {
                let geo = self.to_geographic.project(coord)
                    .with_context(|| format!("Failed to reproject user position ({}, {})", coord.x, coord.y))?;
                LocationStatus::Available { name: municipality.name.clone(), lon: geo.x, lat: geo.y }
            }
            None => LocationStatus::Outside,
        };

        self.transition(status);
        Ok(&self.status)
    }

    /// Handle a geolocation failure: the marker is cleared.
    pub fn position_error(&mut self, error: GeolocationError) -> &LocationStatus {
        self.marker = None;
        self.transition(LocationStatus::Unavailable { error: Some(error) });
        &self.status
    }

    fn transition(&mut self, next: LocationStatus) {
        if self.status.panel() != next.panel() {
            tracing::debug!(from = ?self.status.panel(), to = ?next.panel(), "location status changed");
        }
        if let LocationStatus::Unavailable { error: Some(error) } = &next {
            tracing::warn!(%error, "geolocation failed");
        }
        self.status = next;
    }
}
