use js_sys::Function;
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{Geolocation, PositionOptions};

use obcine_core::{Crs, GeolocationError, Projector};

use crate::{common::*, session::{status_view, update_from_lon_lat, SharedSession}};

/// A `navigator.geolocation.watchPosition` subscription feeding the session.
#[wasm_bindgen]
pub struct WasmTracking {
    geolocation: Geolocation,
    watch_id: Option<i32>,
    _on_position: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

impl WasmTracking {
    pub(crate) fn start(session: SharedSession, on_update: Function) -> Result<WasmTracking, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_err("no global window"))?;
        let geolocation = match window.navigator().geolocation() {
            Ok(geolocation) => geolocation,
            Err(e) => {
                // No geolocation on this host: report it like any other error.
                session.borrow_mut().position_error(GeolocationError::Unsupported);
                let view = to_js(&status_view(&session.borrow()));
                notify(&on_update, view);
                return Err(e);
            }
        };

        let map_crs = session.borrow().config().map_crs;
        let projector = Projector::new(Crs::Wgs84, map_crs).map_err(js_err)?;

        let on_position = {
            let session = session.clone();
            let on_update = on_update.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |position: JsValue| {
                let updated = position_lon_lat(&position)
                    .and_then(|(lon, lat)| update_from_lon_lat(&session, &projector, lon, lat));
                match updated {
                    Ok(()) => {
                        let view = to_js(&status_view(&session.borrow()));
                        notify(&on_update, view);
                    }
                    Err(e) => web_sys::console::error_1(&js_err(format!("{e:#}"))),
                }
            })
        };

        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |error: JsValue| {
            session.borrow_mut().position_error(GeolocationError::from_code(error_code(&error)));
            let view = to_js(&status_view(&session.borrow()));
            notify(&on_update, view);
        });

        let options = PositionOptions::new();
        options.set_enable_high_accuracy(true);
        let watch_id = geolocation.watch_position_with_error_callback_and_options(
            on_position.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &options,
        )?;

        Ok(WasmTracking { geolocation, watch_id: Some(watch_id), _on_position: on_position, _on_error: on_error })
    }

    fn clear(&mut self) {
        if let Some(id) = self.watch_id.take() {
            self.geolocation.clear_watch(id);
        }
    }
}

#[wasm_bindgen]
impl WasmTracking {
    pub fn is_tracking(&self) -> bool { self.watch_id.is_some() }

    pub fn stop(&mut self) { self.clear(); }
}

impl Drop for WasmTracking {
    fn drop(&mut self) { self.clear(); }
}
