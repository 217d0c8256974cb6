use anyhow::{anyhow, Result};
use js_sys::{Function, Reflect};
use serde::Serialize;
use wasm_bindgen::JsValue;

pub(crate) fn js_err(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Serialize through a JSON string so maps come out as plain JS objects.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value)
        .map_err(|e| js_err(format!("Failed to serialize value to JSON: {e}")))?;
    js_sys::JSON::parse(&text)
}

/// Read a numeric property from a JS object.
pub(crate) fn get_f64(obj: &JsValue, key: &str) -> Result<f64> {
    Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|e| anyhow!("error getting property '{key}': {e:?}"))?
        .as_f64()
        .ok_or_else(|| anyhow!("property '{key}' is not a number"))
}

/// Extract (longitude, latitude) from a browser `GeolocationPosition`.
pub(crate) fn position_lon_lat(position: &JsValue) -> Result<(f64, f64)> {
    let coords = Reflect::get(position, &JsValue::from_str("coords"))
        .map_err(|e| anyhow!("position has no coords: {e:?}"))?;
    Ok((get_f64(&coords, "longitude")?, get_f64(&coords, "latitude")?))
}

/// Extract the numeric `code` from a browser `GeolocationPositionError`; 0 if missing.
pub(crate) fn error_code(error: &JsValue) -> u16 {
    get_f64(error, "code").map(|code| code as u16).unwrap_or(0)
}

/// Invoke a JS callback with one argument, logging instead of propagating failures.
pub(crate) fn notify(callback: &Function, value: Result<JsValue, JsValue>) {
    let result = value.and_then(|v| callback.call1(&JsValue::NULL, &v));
    if let Err(e) = result {
        web_sys::console::error_1(&e);
    }
}
