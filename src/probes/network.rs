//! Network & anonymity probes.

use std::rc::Rc;

use integrity_core::{CheckConfig, ProbeOutcome, ProbeResult, Verdict};
use js_sys::{Array, Object};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use super::js;

const UNDEFINED: &str = "undefined";

/// Compare the browser timezone with the one the IP geolocation service
/// reports. `lookup` is the service's `timezone` field or the lookup error.
pub fn assess_timezones(browser: &str, lookup: Result<Option<String>, String>) -> Verdict {
    match lookup {
        Err(message) => Verdict::flagged(format!(
            "Could not perform IP geolocation check. Error: {}",
            message
        )),
        Ok(ip) => {
            let mismatch = ip.as_deref() != Some(browser);
            let mut detail = format!(
                "Browser Timezone: {}\nIP-based Timezone: {}",
                browser,
                ip.as_deref().unwrap_or(UNDEFINED)
            );
            if mismatch {
                detail.push_str("\n(Mismatch suggests use of a VPN or proxy).");
            }
            Verdict::from_flag(mismatch, detail)
        }
    }
}

/// `Intl.DateTimeFormat().resolvedOptions().timeZone`
fn browser_timezone() -> String {
    let format = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new());
    let options: JsValue = format.resolved_options().into();
    js::get_string(&options, "timeZone").unwrap_or_else(|| UNDEFINED.to_string())
}

async fn lookup_timezone(url: &str) -> Result<Option<String>, String> {
    let window = js::window().map_err(|e| e.to_string())?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| js::error_message(&e))?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| "Unexpected fetch result".to_string())?;
    if !response.ok() {
        return Err("API request failed".to_string());
    }
    let json = response.json().map_err(|e| js::error_message(&e))?;
    let body = JsFuture::from(json)
        .await
        .map_err(|e| js::error_message(&e))?;
    Ok(js::get_string(&body, "timezone"))
}

pub async fn vpn_proxy(config: Rc<CheckConfig>) -> ProbeResult {
    let lookup = lookup_timezone(&config.geolocation_url).await;
    if let Err(message) = &lookup {
        log::warn!("IP geolocation lookup failed: {}", message);
    }
    Ok(ProbeOutcome::single(assess_timezones(
        &browser_timezone(),
        lookup,
    )))
}

/// Fields of the Network Information API.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub downlink_mbps: Option<f64>,
    pub rtt_ms: Option<f64>,
    pub save_data: bool,
}

fn show<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| UNDEFINED.to_string())
}

pub fn assess_connection(info: Option<&ConnectionInfo>) -> Verdict {
    let Some(info) = info else {
        return Verdict::pass("Network information not available.");
    };
    let mut detail = format!(
        "Effective Type: {}\nDownlink Speed: {} Mbps\nRound-Trip Time: {} ms",
        show(&info.effective_type),
        show(&info.downlink_mbps),
        show(&info.rtt_ms)
    );
    let degraded = info.effective_type.as_deref() == Some("slow-2g") || info.save_data;
    if degraded {
        detail.push_str("\n(Connection is very slow or in data-saving mode).");
    }
    Verdict::from_flag(degraded, detail)
}

pub async fn network_info() -> ProbeResult {
    let navigator = js::navigator()?;
    let connection = ["connection", "mozConnection", "webkitConnection"]
        .iter()
        .filter_map(|prop| js::get(&navigator, prop).ok())
        .find(|value| value.is_object());

    let info = connection.map(|conn| ConnectionInfo {
        effective_type: js::get_string(&conn, "effectiveType"),
        downlink_mbps: js::get_f64(&conn, "downlink"),
        rtt_ms: js::get_f64(&conn, "rtt"),
        save_data: js::get_truthy(&conn, "saveData"),
    });

    Ok(ProbeOutcome::single(assess_connection(info.as_ref())))
}
