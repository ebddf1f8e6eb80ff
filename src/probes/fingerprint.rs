//! Fingerprinting probes.
//!
//! Both probes pass whenever a fingerprint can be produced; the hash is
//! reported as evidence. Hashing is SHA-256 over the UTF-8 text, hex-encoded.

use integrity_core::{ProbeOutcome, ProbeResult, Verdict};
use js_sys::{Array, Float32Array, Reflect};
use sha2::{Digest, Sha256};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::js;

const CANVAS_TEXT: &str = "Browser Integrity Check 🧐";

const AUDIO_SAMPLE_RATE: f64 = 44100.0;
const OSCILLATOR_HZ: f64 = 10000.0;

/// Compressor settings applied before rendering.
const COMPRESSOR_PARAMS: [(&str, f64); 5] = [
    ("threshold", -50.0),
    ("knee", 40.0),
    ("ratio", 12.0),
    ("attack", 0.0),
    ("release", 0.25),
];

/// Hex-encoded SHA-256 of `message`.
pub fn sha256_hex(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// Sum of absolute sample values, accumulated in double precision.
pub fn sample_sum(samples: &[f32]) -> f64 {
    samples.iter().map(|s| f64::from(s.abs())).sum()
}

pub fn canvas_verdict(data_url: Result<String, JsValue>) -> Verdict {
    match data_url {
        Ok(url) => Verdict::pass(format!("Canvas Hash: {}", sha256_hex(&url))),
        Err(err) => {
            log::debug!("Canvas fingerprint failed: {:?}", err);
            Verdict::flagged("Could not generate canvas fingerprint.")
        }
    }
}

pub fn audio_verdict(sum_text: Result<String, JsValue>) -> Verdict {
    match sum_text {
        Ok(text) => Verdict::pass(format!("Audio Hash: {}", sha256_hex(&text))),
        Err(err) => {
            log::debug!("Audio fingerprint failed: {:?}", err);
            Verdict::flagged("Could not generate audio fingerprint.")
        }
    }
}

fn render_canvas() -> Result<String, JsValue> {
    let document = js::document().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("canvas is not an HtmlCanvasElement"))?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context not available"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("unexpected 2d context type"))?;

    let fill_style = JsValue::from_str("fillStyle");
    ctx.set_text_baseline("top");
    ctx.set_font("14px \"Arial\"");
    ctx.set_text_baseline("alphabetic");
    Reflect::set(&ctx, &fill_style, &JsValue::from_str("#f60"))?;
    ctx.fill_rect(125.0, 1.0, 62.0, 20.0);
    Reflect::set(&ctx, &fill_style, &JsValue::from_str("#069"))?;
    ctx.fill_text(CANVAS_TEXT, 2.0, 15.0)?;
    Reflect::set(&ctx, &fill_style, &JsValue::from_str("rgba(102, 204, 0, 0.7)"))?;
    ctx.fill_text(CANVAS_TEXT, 4.0, 17.0)?;

    canvas.to_data_url()
}

pub async fn canvas_fingerprint() -> ProbeResult {
    Ok(ProbeOutcome::single(canvas_verdict(render_canvas())))
}

fn set_param(node: &JsValue, param: &str, value: f64, at: &JsValue) -> Result<(), JsValue> {
    let param = js::get(node, param)?;
    js::call_method(
        &param,
        "setValueAtTime",
        &Array::of2(&JsValue::from_f64(value), at),
    )?;
    Ok(())
}

/// Render a compressed triangle wave offline and return the sample sum as
/// JavaScript would print it.
async fn render_audio() -> Result<String, JsValue> {
    let constructor = ["OfflineAudioContext", "webkitOfflineAudioContext"]
        .into_iter()
        .find(|name| js::get_global(name).map(|c| c.is_function()).unwrap_or(false))
        .ok_or_else(|| JsValue::from_str("OfflineAudioContext not available"))?;

    let ctx = js::construct_global(
        constructor,
        &Array::of3(
            &JsValue::from_f64(1.0),
            &JsValue::from_f64(AUDIO_SAMPLE_RATE),
            &JsValue::from_f64(AUDIO_SAMPLE_RATE),
        ),
    )?;
    let now = js::get(&ctx, "currentTime")?;

    let oscillator = js::call_method(&ctx, "createOscillator", &Array::new())?;
    Reflect::set(&oscillator, &JsValue::from_str("type"), &JsValue::from_str("triangle"))?;
    set_param(&oscillator, "frequency", OSCILLATOR_HZ, &now)?;

    let compressor = js::call_method(&ctx, "createDynamicsCompressor", &Array::new())?;
    for (param, value) in COMPRESSOR_PARAMS {
        set_param(&compressor, param, value, &now)?;
    }

    js::call_method(&oscillator, "connect", &Array::of1(&compressor))?;
    js::call_method(&compressor, "connect", &Array::of1(&js::get(&ctx, "destination")?))?;
    js::call_method(&oscillator, "start", &Array::of1(&JsValue::from_f64(0.0)))?;

    let buffer = js::call_async(&ctx, "startRendering", &Array::new()).await?;
    let channel: Float32Array = js::call_method(
        &buffer,
        "getChannelData",
        &Array::of1(&JsValue::from_f64(0.0)),
    )?
    .dyn_into()
    .map_err(|_| JsValue::from_str("channel data is not a Float32Array"))?;

    let sum = sample_sum(&channel.to_vec());
    let text = js_sys::Number::from(sum).to_string(10)?;
    Ok(String::from(text))
}

pub async fn audio_fingerprint() -> ProbeResult {
    Ok(ProbeOutcome::single(audio_verdict(render_audio().await)))
}
