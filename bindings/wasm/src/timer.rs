use std::time::Duration;

use js_sys::Function;
use wasm_bindgen::{prelude::*, JsCast};

use crate::{common::*, session::SharedSession};

/// A running marker animation driven by `setInterval`.
/// Cleared on `stop()` or when garbage-collected from JS.
#[wasm_bindgen]
pub struct WasmAnimation {
    interval_id: Option<i32>,
    _tick: Closure<dyn FnMut()>,
}

impl WasmAnimation {
    pub(crate) fn start(session: SharedSession, period: Duration, on_step: Function) -> Result<WasmAnimation, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_err("no global window"))?;
        let timeout = i32::try_from(period.as_millis()).map_err(js_err)?;

        let tick = Closure::<dyn FnMut()>::new(move || {
            // Skip the frame if another handler holds the session.
            let Ok(mut session) = session.try_borrow_mut() else { return };
            let style = to_js(&session.step_animation());
            drop(session);
            notify(&on_step, style);
        });

        let interval_id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            timeout,
        )?;
        Ok(WasmAnimation { interval_id: Some(interval_id), _tick: tick })
    }

    fn clear(&mut self) {
        if let (Some(id), Some(window)) = (self.interval_id.take(), web_sys::window()) {
            window.clear_interval_with_handle(id);
        }
    }
}

#[wasm_bindgen]
impl WasmAnimation {
    pub fn is_running(&self) -> bool { self.interval_id.is_some() }

    pub fn stop(&mut self) { self.clear(); }
}

impl Drop for WasmAnimation {
    fn drop(&mut self) { self.clear(); }
}
