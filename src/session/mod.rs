mod animator;
mod location;
mod popup;

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use geo::Coord;
use serde_json::Value;

use crate::{config::SessionConfig, municipality::{Municipality, MunicipalityLayer}};

pub use animator::{generate_location_styles, AnimationHandle, MarkerAnimator, MarkerStyle};
pub use location::{GeolocationError, LocationStatus, LocationTracker, PanelKind, StatusPanel};
pub use popup::{Popup, PopupContent, Selection};

/// Everything the map's event handlers share: the municipality layer, the
/// current selection and popup, the location tracker and the marker animation.
/// Handlers are methods; each runs to completion.
#[derive(Debug)]
pub struct MapSession {
    config: SessionConfig,
    layer: Arc<MunicipalityLayer>,
    selection: Selection,
    popup: Popup,
    tracker: LocationTracker,
    animator: Option<MarkerAnimator>, // None while running on a background thread
}

impl MapSession {
    pub fn new(layer: Arc<MunicipalityLayer>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        if layer.crs() != config.map_crs {
            bail!("Municipality layer is in {} but the map uses {}", layer.crs(), config.map_crs);
        }

        Ok(Self {
            tracker: LocationTracker::new(config.map_crs)?,
            animator: Some(MarkerAnimator::new(generate_location_styles(config.marker_max_radius, config.marker_min_radius))?),
            selection: Selection::default(),
            popup: Popup::default(),
            layer,
            config,
        })
    }

    /// Load the dataset from GeoJSON and start a session over it.
    pub fn from_geojson_bytes(bytes: &[u8], config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let layer = MunicipalityLayer::from_geojson_bytes(bytes, &config)?;
        Self::new(Arc::new(layer), config)
    }

    #[inline] pub fn config(&self) -> &SessionConfig { &self.config }

    #[inline] pub fn layer(&self) -> &Arc<MunicipalityLayer> { &self.layer }

    /// The municipality under `coord` (map CRS), if any.
    #[inline]
    pub fn find_municipality(&self, coord: Coord<f64>) -> Option<&Municipality> {
        self.layer.find_municipality(coord)
    }

    // -----------------------------------------------------------------------
    // Click handling
    // -----------------------------------------------------------------------

    /// Handle a map click at `coord` (map CRS).
    /// The old selection is cleared first, whether or not the lookup hits.
    pub fn click(&mut self, coord: Coord<f64>) -> &Popup {
        self.selection.clear();

        match self.layer.find_municipality(coord) {
            Some(municipality) => {
                tracing::debug!(id = %municipality.id, name = %municipality.name, "municipality selected");
                self.selection.set(municipality.id);
                self.popup.show(coord, PopupContent::new(municipality));
            }
            None => self.popup.hide(),
        }

        &self.popup
    }

    #[inline] pub fn popup(&self) -> &Popup { &self.popup }

    #[inline] pub fn selection(&self) -> Selection { self.selection }

    pub fn selected(&self) -> Option<&Municipality> {
        self.selection.get().and_then(|id| self.layer.get(id))
    }

    /// The highlight layer contents as a GeoJSON FeatureCollection (map CRS).
    pub fn selection_geojson(&self) -> Value {
        let ids: Vec<_> = self.selection.get().into_iter().collect();
        self.layer.to_geojson(&ids)
    }

    // -----------------------------------------------------------------------
    // Location tracking
    // -----------------------------------------------------------------------

    /// Handle a position-changed event (map CRS); `None` when the fix is lost.
    pub fn update_position(&mut self, position: Option<Coord<f64>>) -> Result<&LocationStatus> {
        self.tracker.update_position(&self.layer, position)
    }

    /// Handle a geolocation error event.
    pub fn position_error(&mut self, error: GeolocationError) -> &LocationStatus {
        self.tracker.position_error(error)
    }

    #[inline] pub fn location_status(&self) -> &LocationStatus { self.tracker.status() }

    #[inline] pub fn status_panel(&self) -> StatusPanel { self.tracker.panel() }

    /// User marker position (map CRS), `None` while cleared.
    #[inline] pub fn user_marker(&self) -> Option<Coord<f64>> { self.tracker.marker() }

    // -----------------------------------------------------------------------
    // Marker animation
    // -----------------------------------------------------------------------

    /// Advance the marker animation by one frame.
    /// `None` while the animation runs on a background thread.
    pub fn step_animation(&mut self) -> Option<&MarkerStyle> {
        self.animator.as_mut().map(MarkerAnimator::step)
    }

    /// Current marker style, `None` while the animation runs on a background thread.
    #[inline] pub fn marker_style(&self) -> Option<&MarkerStyle> { self.animator.as_ref().map(MarkerAnimator::current) }

    #[inline] pub fn is_animating(&self) -> bool { self.animator.is_none() }

    /// Move the session's animator onto a background thread stepping at the
    /// configured period. Hand the returned handle to `finish_animation` to
    /// get the animator back; dropping it stops the thread and discards the state.
    pub fn spawn_animation<F>(&mut self, on_step: F) -> Result<AnimationHandle>
    where
        F: FnMut(&MarkerStyle) + Send + 'static,
    {
        let animator = self.animator.take().ok_or_else(|| anyhow!("marker animation is already running"))?;
        let restore = animator.clone();
        animator.spawn(self.config.animation_period(), on_step).inspect_err(|_| {
            self.animator = Some(restore);
        })
    }

    /// Stop a spawned animation and resume stepping from where the thread left off.
    pub fn finish_animation(&mut self, handle: AnimationHandle) -> Result<&MarkerStyle> {
        if self.animator.is_some() {
            bail!("marker animation is not running");
        }
        let animator = self.animator.insert(handle.stop()?);
        Ok(animator.current())
    }
}

#[cfg(test)]
mod tests {
    use geo::{coord, polygon, MultiPolygon};

    use crate::{geom::Crs, municipality::{MunicipalityId, UrbanFlag}};
    use super::*;

    fn planar_layer() -> Arc<MunicipalityLayer> {
        let square = |x0: f64| MultiPolygon(vec![polygon![
            (x: x0, y: 0.0), (x: x0 + 10.0, y: 0.0), (x: x0 + 10.0, y: 10.0), (x: x0, y: 10.0), (x: x0, y: 0.0),
        ]]);
        let entity = |idx: u32, name: &str, code: &str| Municipality {
            id: MunicipalityId(idx),
            name: name.into(),
            area_km2: 10.0,
            type_code: code.into(),
            urban: UrbanFlag::classify(code, "D"),
        };
        Arc::new(MunicipalityLayer::new(
            Crs::WebMercator,
            vec![entity(0, "Left", "D"), entity(1, "Right", "N")],
            vec![square(0.0), square(20.0)],
        ).unwrap())
    }

    fn session() -> MapSession {
        MapSession::new(planar_layer(), SessionConfig::default()).unwrap()
    }

    #[test]
    fn click_replaces_selection() {
        let mut s = session();
        s.click(coord! { x: 5.0, y: 5.0 });
        assert_eq!(s.selected().map(|m| &*m.name), Some("Left"));
        s.click(coord! { x: 25.0, y: 5.0 });
        assert_eq!(s.selected().map(|m| &*m.name), Some("Right"));
        assert_eq!(s.selection().len(), 1);
    }

    #[test]
    fn missed_click_clears_selection_and_hides_popup() {
        let mut s = session();
        s.click(coord! { x: 5.0, y: 5.0 });
        let popup = s.click(coord! { x: 15.0, y: 5.0 });
        assert!(!popup.is_visible());
        assert!(s.selection().is_empty());
        assert!(s.selection_geojson()["features"].as_array().unwrap().is_empty());
    }

    #[test]
    fn popup_is_positioned_at_click() {
        let mut s = session();
        let popup = s.click(coord! { x: 2.0, y: 3.0 });
        assert_eq!(popup.position(), Some(coord! { x: 2.0, y: 3.0 }));
        assert_eq!(popup.content().unwrap().lines()[2], "Mestna: DA");
    }

    #[test]
    fn clicks_do_not_touch_location() {
        let mut s = session();
        s.update_position(Some(coord! { x: 25.0, y: 5.0 })).unwrap();
        let before = s.location_status().clone();
        s.click(coord! { x: 5.0, y: 5.0 });
        s.click(coord! { x: 100.0, y: 5.0 });
        assert_eq!(s.location_status(), &before);
        assert_eq!(s.user_marker(), Some(coord! { x: 25.0, y: 5.0 }));
    }

    #[test]
    fn location_does_not_touch_selection() {
        let mut s = session();
        s.click(coord! { x: 5.0, y: 5.0 });
        s.update_position(Some(coord! { x: 100.0, y: 100.0 })).unwrap();
        s.position_error(GeolocationError::Timeout);
        assert_eq!(s.selected().map(|m| &*m.name), Some("Left"));
        assert!(s.popup().is_visible());
    }

    #[test]
    fn crs_mismatch_is_rejected() {
        let config = SessionConfig { map_crs: Crs::Wgs84, ..SessionConfig::default() };
        assert!(MapSession::new(planar_layer(), config).is_err());
    }

    #[test]
    fn animation_follows_config() {
        let config = SessionConfig { marker_max_radius: 6, marker_min_radius: 4, ..SessionConfig::default() };
        let mut s = MapSession::new(planar_layer(), config).unwrap();
        assert_eq!(s.marker_style().unwrap().radius, 6);
        assert_eq!(s.step_animation().unwrap().radius, 5);
        assert_eq!(s.step_animation().unwrap().radius, 6);
    }

    #[test]
    fn spawned_animation_returns_to_session() {
        let config = SessionConfig { animation_period_ms: 5, ..SessionConfig::default() };
        let mut s = MapSession::new(planar_layer(), config).unwrap();
        let frames = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = frames.clone();

        let handle = s.spawn_animation(move |style| sink.lock().unwrap().push(style.radius)).unwrap();
        assert!(s.is_animating());
        assert!(s.marker_style().is_none());
        assert!(s.step_animation().is_none());
        assert!(s.spawn_animation(|_| {}).is_err());

        std::thread::sleep(std::time::Duration::from_millis(60));
        let current = s.finish_animation(handle).unwrap().radius;
        let frames = frames.lock().unwrap().clone();
        assert!(!frames.is_empty());

        // The session continues from the last frame the thread applied.
        assert_eq!(Some(current), frames.last().copied());
        assert!(!s.is_animating());
        assert_eq!(s.marker_style().map(|m| m.radius), Some(current));
    }

    #[test]
    fn finishing_without_running_animation_fails() {
        let mut s = session();
        let mut other = session();
        let handle = other.spawn_animation(|_| {}).unwrap();
        assert!(s.finish_animation(handle).is_err());
        assert_eq!(s.marker_style().unwrap().radius, 12);
    }
}
