//! Browser integrity probes.
//!
//! Window focus and clipboard activity are read from the passive signal
//! counters and live in the core crate; only the developer tools timing
//! check needs the browser.

use std::time::Duration;

use async_trait::async_trait;
use integrity_core::{CheckConfig, Probe, ProbeOutcome, ProbeResult, Verdict};
use js_sys::Function;
use wasm_bindgen::prelude::*;
use web_time::Instant;

use super::js;
use crate::runtime;

pub fn assess_pause(paused_ms: f64, threshold_ms: f64) -> Verdict {
    let detected = paused_ms > threshold_ms;
    let method = if detected {
        "Debugger timing check"
    } else {
        "Not Detected"
    };
    Verdict::from_flag(detected, format!("Detection Method: {}", method))
}

/// Time a `debugger` statement. It only pauses when developer tools are open.
fn time_debugger_statement() -> Result<f64, JsValue> {
    let statement = Function::new_no_args("debugger;");
    let started = Instant::now();
    statement.call0(&JsValue::UNDEFINED)?;
    Ok(started.elapsed().as_secs_f64() * 1000.0)
}

/// Developer tools detection by `debugger` pause timing.
pub struct DevToolsProbe {
    delay: Duration,
    threshold_ms: f64,
}

impl DevToolsProbe {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            delay: Duration::from_millis(u64::from(config.devtools_delay_ms)),
            threshold_ms: config.devtools_pause_threshold_ms,
        }
    }
}

#[async_trait(?Send)]
impl Probe for DevToolsProbe {
    async fn invoke(&self) -> ProbeResult {
        // Let the page settle before timing.
        runtime::sleep(self.delay).await;

        let paused_ms = time_debugger_statement().map_err(js::probe_error)?;
        log::debug!("debugger statement took {:.1} ms", paused_ms);

        Ok(ProbeOutcome::single(assess_pause(paused_ms, self.threshold_ms)))
    }
}
