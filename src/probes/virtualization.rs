//! Virtualization & emulation probes.

use std::rc::Rc;

use integrity_core::{CheckConfig, ProbeOutcome, ProbeResult, Verdict};
use js_sys::Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGlRenderingContext};

use super::{js, matches_keyword};

/// `WEBGL_debug_renderer_info.UNMASKED_VENDOR_WEBGL`
pub const UNMASKED_VENDOR_WEBGL: u32 = 0x9245;
/// `WEBGL_debug_renderer_info.UNMASKED_RENDERER_WEBGL`
pub const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;

pub fn assess_renderer(vendor: &str, renderer: &str, keywords: &[String]) -> Verdict {
    Verdict::from_flag(
        matches_keyword(renderer, keywords),
        format!("Vendor: {}\nRenderer: {}", vendor, renderer),
    )
}

pub async fn webgl_renderer(config: Rc<CheckConfig>) -> ProbeResult {
    let verdict = match read_renderer_info() {
        Ok((vendor, renderer)) => {
            assess_renderer(&vendor, &renderer, &config.suspicious_renderer_keywords)
        }
        Err(err) => {
            log::debug!("WebGL renderer info unavailable: {:?}", err);
            Verdict::flagged("Could not retrieve WebGL renderer info.")
        }
    };
    Ok(ProbeOutcome::single(verdict))
}

fn read_renderer_info() -> Result<(String, String), JsValue> {
    let document = js::document().map_err(|e| JsValue::from_str(&e.to_string()))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")?
        .dyn_into()
        .map_err(|_| JsValue::from_str("canvas is not an HtmlCanvasElement"))?;

    let context = match canvas.get_context("webgl")? {
        Some(context) => context,
        None => canvas
            .get_context("experimental-webgl")?
            .ok_or_else(|| JsValue::from_str("WebGL not available"))?,
    };
    let gl: WebGlRenderingContext = context
        .dyn_into()
        .map_err(|_| JsValue::from_str("unexpected WebGL context type"))?;

    gl.get_extension("WEBGL_debug_renderer_info")?
        .ok_or_else(|| JsValue::from_str("WEBGL_debug_renderer_info not available"))?;

    let renderer = gl
        .get_parameter(UNMASKED_RENDERER_WEBGL)?
        .as_string()
        .ok_or_else(|| JsValue::from_str("renderer is not a string"))?;
    let vendor = gl
        .get_parameter(UNMASKED_VENDOR_WEBGL)?
        .as_string()
        .unwrap_or_else(|| "undefined".to_string());

    Ok((vendor, renderer))
}

pub fn assess_automation(webdriver: bool) -> Verdict {
    if webdriver {
        Verdict::flagged(
            "navigator.webdriver flag is TRUE. Browser is likely controlled by automation.",
        )
    } else {
        Verdict::pass("No automation flags detected.")
    }
}

pub async fn automation_flags() -> ProbeResult {
    let navigator = js::navigator()?;
    Ok(ProbeOutcome::single(assess_automation(js::get_truthy(
        &navigator,
        "webdriver",
    ))))
}

pub fn assess_cores(cores: u32, min_cores: u32) -> Verdict {
    let mut detail = format!("Logical Cores reported: {}.", cores);
    let low = cores <= min_cores;
    if low {
        detail.push_str(" (Low core count may indicate a VM).");
    }
    Verdict::from_flag(low, detail)
}

pub async fn hardware_concurrency(config: Rc<CheckConfig>) -> ProbeResult {
    let navigator = js::navigator()?;
    let cores = js::get_f64(&navigator, "hardwareConcurrency").unwrap_or(0.0) as u32;
    Ok(ProbeOutcome::single(assess_cores(cores, config.min_logical_cores)))
}

/// `None` when the browser does not expose `navigator.deviceMemory`.
pub fn assess_memory(device_memory_gb: Option<f64>, min_gb: f64) -> Verdict {
    match device_memory_gb.filter(|gb| *gb > 0.0) {
        None => Verdict::pass("Browser does not support deviceMemory API."),
        Some(gb) => {
            let mut detail = format!("Estimated system RAM: {} GB.", gb);
            let low = gb <= min_gb;
            if low {
                detail.push_str(" (Low RAM may indicate a VM).");
            }
            Verdict::from_flag(low, detail)
        }
    }
}

pub async fn cpu_ram(config: Rc<CheckConfig>) -> ProbeResult {
    let navigator = js::navigator()?;
    let memory = js::get_f64(&navigator, "deviceMemory");
    Ok(ProbeOutcome::single(assess_memory(
        memory,
        config.min_device_memory_gb,
    )))
}

/// What the Battery Status API reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryReading {
    Unsupported,
    Unavailable,
    State {
        charging: bool,
        level: f64,
        discharging_time: f64,
    },
}

pub fn assess_battery(reading: BatteryReading) -> Verdict {
    match reading {
        BatteryReading::Unsupported => {
            Verdict::pass("Battery API not supported (typical for desktops).")
        }
        BatteryReading::Unavailable => Verdict::pass("Could not access Battery API."),
        BatteryReading::State {
            charging,
            level,
            discharging_time,
        } => {
            let mut detail = format!("Charging: {}\nLevel: {}%", charging, level * 100.0);
            // Always full, always charging, never discharging.
            let suspicious = charging && level == 1.0 && discharging_time == f64::INFINITY;
            if suspicious {
                detail.push_str("\n(State is consistent with some virtual machines).");
            }
            Verdict::from_flag(suspicious, detail)
        }
    }
}

pub async fn battery_status() -> ProbeResult {
    let navigator = js::navigator()?;
    let reading = if !js::has_method(&navigator, "getBattery") {
        BatteryReading::Unsupported
    } else {
        match js::call_async(&navigator, "getBattery", &Array::new()).await {
            Ok(battery) => BatteryReading::State {
                charging: js::get_truthy(&battery, "charging"),
                level: js::get_f64(&battery, "level").unwrap_or(0.0),
                discharging_time: js::get_f64(&battery, "dischargingTime").unwrap_or(0.0),
            },
            Err(err) => {
                log::debug!("Battery API failed: {:?}", err);
                BatteryReading::Unavailable
            }
        }
    };
    Ok(ProbeOutcome::single(assess_battery(reading)))
}

/// Motion sensor availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorAccess {
    /// Permission API present and permission granted.
    Granted,
    /// Permission API present and permission refused.
    Denied,
    /// Permission request threw; carries the error name.
    Failed(String),
    /// No permission API, but `ondevicemotion` exists.
    Available,
    /// No motion sensor support at all.
    Absent,
}

pub fn assess_sensors(access: &SensorAccess) -> Verdict {
    match access {
        SensorAccess::Granted | SensorAccess::Available => {
            Verdict::pass("Device motion sensors are available.")
        }
        SensorAccess::Denied => Verdict::flagged("Permission to access motion sensors was denied."),
        SensorAccess::Failed(name) => {
            Verdict::flagged(format!("Error accessing motion sensors: {}", name))
        }
        SensorAccess::Absent => {
            Verdict::flagged("Device does not report motion sensors (may indicate an emulator).")
        }
    }
}

pub async fn device_sensors() -> ProbeResult {
    let window: JsValue = js::window()?.into();
    let motion_event = js::get_global("DeviceMotionEvent").map_err(js::probe_error)?;

    let access = if js::has_method(&motion_event, "requestPermission") {
        match js::call_async(&motion_event, "requestPermission", &Array::new()).await {
            Ok(state) if state.as_string().as_deref() == Some("granted") => SensorAccess::Granted,
            Ok(_) => SensorAccess::Denied,
            Err(err) => SensorAccess::Failed(js::error_name(&err)),
        }
    } else if js::has(&window, "ondevicemotion") {
        SensorAccess::Available
    } else {
        SensorAccess::Absent
    };

    Ok(ProbeOutcome::single(assess_sensors(&access)))
}
