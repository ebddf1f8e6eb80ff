//! Reflect utility wrappers for reading browser APIs.
//!
//! Most probe signals are non-standard or vendor-prefixed properties that
//! web-sys does not bind (`navigator.deviceMemory`, `navigator.connection`,
//! `getBattery`, `getScreenDetails`), so they are read dynamically.

use integrity_core::ProbeError;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Get the global window object.
pub fn window() -> Result<web_sys::Window, ProbeError> {
    web_sys::window().ok_or_else(|| ProbeError::Unsupported("no window".into()))
}

/// Get the global document.
pub fn document() -> Result<web_sys::Document, ProbeError> {
    window()?
        .document()
        .ok_or_else(|| ProbeError::Unsupported("no document".into()))
}

/// Get `window.navigator` as a plain value.
pub fn navigator() -> Result<JsValue, ProbeError> {
    Ok(window()?.navigator().into())
}

/// Get a property from the global scope.
pub fn get_global(prop: &str) -> Result<JsValue, JsValue> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(prop))
}

/// Read a property; `undefined` when the target is not an object.
pub fn get(target: &JsValue, prop: &str) -> Result<JsValue, JsValue> {
    if !target.is_object() && !target.is_function() {
        return Ok(JsValue::UNDEFINED);
    }
    Reflect::get(target, &JsValue::from_str(prop))
}

/// `prop in target`.
pub fn has(target: &JsValue, prop: &str) -> bool {
    if !target.is_object() && !target.is_function() {
        return false;
    }
    Reflect::has(target, &JsValue::from_str(prop)).unwrap_or(false)
}

/// True when `target[prop]` is callable.
pub fn has_method(target: &JsValue, prop: &str) -> bool {
    get(target, prop).map(|v| v.is_function()).unwrap_or(false)
}

/// Read an optional string property.
pub fn get_string(target: &JsValue, prop: &str) -> Option<String> {
    get(target, prop).ok().and_then(|v| v.as_string())
}

/// Read an optional numeric property.
pub fn get_f64(target: &JsValue, prop: &str) -> Option<f64> {
    get(target, prop).ok().and_then(|v| v.as_f64())
}

/// Read a property as a JS truthiness test.
pub fn get_truthy(target: &JsValue, prop: &str) -> bool {
    get(target, prop).map(|v| v.is_truthy()).unwrap_or(false)
}

/// Call `target[method](...args)`.
pub fn call_method(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let func: Function = get(target, method)?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("{} is not a function", method)))?;
    Reflect::apply(&func, target, args)
}

/// Construct `new globalThis[name](...args)`.
pub fn construct_global(name: &str, args: &Array) -> Result<JsValue, JsValue> {
    let ctor: Function = get_global(name)?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("{} not found", name)))?;
    Reflect::construct(&ctor, args)
}

/// Await a value that may be a promise.
pub async fn resolve(value: JsValue) -> Result<JsValue, JsValue> {
    let promise = js_sys::Promise::resolve(&value);
    JsFuture::from(promise).await
}

/// Call a promise-returning method and await its result.
pub async fn call_async(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    resolve(call_method(target, method, args)?).await
}

/// `error.name`, or a generic fallback.
pub fn error_name(err: &JsValue) -> String {
    get_string(err, "name").unwrap_or_else(|| "Error".to_string())
}

/// `error.message`, or the value itself when it is a string.
pub fn error_message(err: &JsValue) -> String {
    get_string(err, "message")
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}

/// Convert a thrown JS value into a probe failure.
pub fn probe_error(err: JsValue) -> ProbeError {
    match error_name(&err).as_str() {
        "NotAllowedError" | "SecurityError" => ProbeError::PermissionDenied(error_message(&err)),
        "NotSupportedError" => ProbeError::Unsupported(error_message(&err)),
        name => ProbeError::Js(format!("{}: {}", name, error_message(&err))),
    }
}
