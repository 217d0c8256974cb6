use std::{cell::RefCell, rc::Rc, sync::Arc};

use anyhow::Context;
use geo::Coord;
use js_sys::Function;
use serde_json::{json, Value};
use wasm_bindgen::{prelude::wasm_bindgen, JsValue};

use obcine_core::{Crs, GeolocationError, MapSession, MunicipalityLayer, Projector, SessionConfig};

use crate::{common::*, geolocation::WasmTracking, timer::WasmAnimation};

/// Shared by the session object and the timer/geolocation callbacks.
pub(crate) type SharedSession = Rc<RefCell<MapSession>>;

#[wasm_bindgen]
pub struct WasmSession {
    inner: SharedSession,
    from_geographic: Projector,
}

#[wasm_bindgen]
impl WasmSession {
    /// Load the municipality GeoJSON (text) and start a session.
    /// config: optional JSON string overriding the default session settings.
    #[wasm_bindgen(constructor)]
    pub fn new(geojson: &str, config: Option<String>) -> Result<WasmSession, JsValue> {
        let config = match config.as_deref() {
            Some(text) => SessionConfig::from_json_str(text).map_err(js_err)?,
            None => SessionConfig::default(),
        };
        let from_geographic = Projector::new(Crs::Wgs84, config.map_crs).map_err(js_err)?;
        let layer = MunicipalityLayer::from_geojson_str(geojson, &config)
            .context("Failed to load municipality layer")
            .map_err(|e| js_err(format!("{e:#}")))?;
        web_sys::console::log_1(&JsValue::from_str(&format!("Loaded {} municipalities", layer.len())));

        let session = MapSession::new(Arc::new(layer), config).map_err(js_err)?;
        Ok(WasmSession { inner: Rc::new(RefCell::new(session)), from_geographic })
    }

    /// Initial view: { center: [x, y], zoom } in map CRS.
    pub fn view(&self) -> Result<JsValue, JsValue> {
        let session = self.inner.borrow();
        let config = session.config();
        to_js(&json!({ "center": config.map_center, "zoom": config.zoom, "crs": config.map_crs }))
    }

    /// Handle a map click (map CRS).
    /// Returns { visible, position, html, lines } describing the popup.
    pub fn click(&self, x: f64, y: f64) -> Result<JsValue, JsValue> {
        let mut session = self.inner.borrow_mut();
        let popup = session.click(Coord { x, y });
        let view = match (popup.position(), popup.content()) {
            (Some(at), Some(content)) => json!({
                "visible": true,
                "position": [at.x, at.y],
                "html": content.to_html(),
                "lines": content.lines(),
            }),
            _ => json!({ "visible": false }),
        };
        to_js(&view)
    }

    /// Highlight layer contents as a GeoJSON FeatureCollection.
    pub fn selection_geojson(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow().selection_geojson())
    }

    /// Handle a position change in map CRS; omit both arguments when the fix is lost.
    pub fn update_position(&self, x: Option<f64>, y: Option<f64>) -> Result<JsValue, JsValue> {
        let position = x.zip(y).map(|(x, y)| Coord { x, y });
        self.inner.borrow_mut().update_position(position).map_err(js_err)?;
        self.status()
    }

    /// Handle a position change given in lon/lat degrees.
    pub fn update_geographic_position(&self, lon: f64, lat: f64) -> Result<JsValue, JsValue> {
        update_from_lon_lat(&self.inner, &self.from_geographic, lon, lat).map_err(js_err)?;
        self.status()
    }

    /// Handle a geolocation error by its `GeolocationPositionError.code`.
    pub fn position_error(&self, code: u16) -> Result<JsValue, JsValue> {
        self.inner.borrow_mut().position_error(GeolocationError::from_code(code));
        self.status()
    }

    /// { status, panel, name, latitude, longitude, marker } for the `#position` panel.
    pub fn status(&self) -> Result<JsValue, JsValue> {
        to_js(&status_view(&self.inner.borrow()))
    }

    pub fn marker_style(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.borrow().marker_style()).map_err(|e| e.into())
    }

    pub fn step_animation(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.borrow_mut().step_animation())
    }

    /// Step the marker animation every configured period, passing each style to `on_step`.
    pub fn start_animation(&self, on_step: Function) -> Result<WasmAnimation, JsValue> {
        let period = self.inner.borrow().config().animation_period();
        WasmAnimation::start(self.inner.clone(), period, on_step)
    }

    /// Watch the device position, passing the status to `on_update` after every event.
    pub fn track_location(&self, on_update: Function) -> Result<WasmTracking, JsValue> {
        WasmTracking::start(self.inner.clone(), on_update)
    }
}

pub(crate) fn update_from_lon_lat(session: &SharedSession, projector: &Projector, lon: f64, lat: f64) -> anyhow::Result<()> {
    let coord = projector.project(Coord { x: lon, y: lat })?;
    session.borrow_mut().update_position(Some(coord))?;
    Ok(())
}

pub(crate) fn status_view(session: &MapSession) -> Value {
    let status = session.location_status();
    json!({
        "status": status,
        "panel": session.status_panel(),
        "name": status.name(),
        "latitude": status.latitude_text(),
        "longitude": status.longitude_text(),
        "marker": session.user_marker().map(|c| [c.x, c.y]),
    })
}
