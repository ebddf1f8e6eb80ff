//! # Browser Integrity Checker
//!
//! A system integrity check for web pages, compiled to WebAssembly.
//!
//! A fixed registry of probes inspects the browser environment (GPU
//! renderer, automation flags, hardware profile, media devices, focus and
//! clipboard activity, network, fingerprints). All probes run concurrently,
//! a failing probe only flags its own rows, and the report table updates
//! row by row as results arrive.
//!
//! ## Architecture
//!
//! ```text
//! IntegrityChecker (WASM)
//!   ↓
//! Orchestrator (integrity-core)
//!   ↓                     ↓
//! Browser probes      DomReportSink
//!   ↓
//! Browser APIs (WebGL, Navigator, MediaDevices, Intl, fetch)
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use integrity_core::{
    CheckConfig, Orchestrator, OrchestratorConfig, ProbeRegistry, Report, SignalCounters,
};
use wasm_bindgen::prelude::*;

// Modules
pub mod dom;
mod error;
pub mod listeners;
pub mod probes;
pub mod runtime;

pub use dom::DomReportSink;
pub use error::{CheckError, ErrorCode, ErrorInfo, Result};
pub use listeners::SignalListeners;
pub use runtime::BrowserTimer;

/// Initialize the integrity checker
///
/// This sets up logging and any global state needed.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    // Initialize logging
    if console_log::init_with_level(log::Level::Info).is_err() {
        return;
    }

    log::info!("Integrity checker initialized");
}

/// Read options from JS. `undefined` and `null` mean defaults.
fn config_from_js(options: JsValue) -> Result<CheckConfig> {
    if options.is_undefined() || options.is_null() {
        return Ok(CheckConfig::default());
    }
    let config: CheckConfig = serde_wasm_bindgen::from_value(options)?;
    config.validate()?;
    Ok(config)
}

/// Clears the running flag when a run ends, including on early return.
struct RunGuard(Rc<Cell<bool>>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Main integrity checker
#[wasm_bindgen]
pub struct IntegrityChecker {
    // Policy parameters
    config: Rc<CheckConfig>,

    // Passive signal counters (never reset)
    counters: Arc<SignalCounters>,

    // Keeps the signal listeners attached
    _listeners: SignalListeners,

    // Probe registry (validated at construction)
    registry: ProbeRegistry,

    // Orchestrator with a browser timer attached
    orchestrator: Orchestrator,

    // Run state
    running: Rc<Cell<bool>>,
    last_report: RefCell<Option<Report>>,
}

#[wasm_bindgen]
impl IntegrityChecker {
    /// Create a checker and start counting focus and clipboard events
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> std::result::Result<IntegrityChecker, JsValue> {
        log::info!("Creating integrity checker");

        let config = Rc::new(config_from_js(options)?);

        let counters = SignalCounters::shared();
        let listeners = SignalListeners::install(counters.clone())?;

        let registry =
            probes::default_registry(&config, &counters).map_err(CheckError::from)?;

        let orchestrator = Orchestrator::new(OrchestratorConfig::from(config.as_ref()))
            .with_timer(Rc::new(BrowserTimer));

        log::info!(
            "✅ Integrity checker ready: {} probes, {} rows",
            registry.len(),
            registry.row_count()
        );
        if let Some(timeout) = config.probe_timeout() {
            log::info!("  ⏱️ Probe timeout: {} ms", timeout.as_millis());
        }

        Ok(Self {
            config,
            counters,
            _listeners: listeners,
            registry,
            orchestrator,
            running: Rc::new(Cell::new(false)),
            last_report: RefCell::new(None),
        })
    }

    /// Run every check once and render the results
    ///
    /// Resolves to the run summary once every probe has settled. Rows in the
    /// page update as soon as their probe finishes.
    #[wasm_bindgen]
    pub async fn run(&self) -> std::result::Result<JsValue, JsValue> {
        if self.running.replace(true) {
            return Err(CheckError::AlreadyRunning.into());
        }
        let _guard = RunGuard(self.running.clone());

        let mut sink = DomReportSink::new(dom::document()?);

        log::info!("🔍 Running system check...");
        let summary = self.orchestrator.run(&self.registry, &mut sink).await;

        if sink.rendered() < summary.rows {
            log::warn!(
                "⚠️ Only {} of {} rows were rendered; check the report tables",
                sink.rendered(),
                summary.rows
            );
        }

        *self.last_report.borrow_mut() = Some(sink.into_report());

        Ok(serde_wasm_bindgen::to_value(&summary).map_err(CheckError::from)?)
    }

    /// Whether a run is in progress
    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Current focus-loss and clipboard counts
    #[wasm_bindgen(js_name = signalCounts)]
    pub fn signal_counts(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.counters.snapshot()).map_err(CheckError::from)?)
    }

    /// The report of the last completed run, or `null`
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> std::result::Result<JsValue, JsValue> {
        match self.last_report.borrow().as_ref() {
            Some(report) => {
                Ok(serde_wasm_bindgen::to_value(report).map_err(CheckError::from)?)
            }
            None => Ok(JsValue::NULL),
        }
    }

    /// Row keys in display order
    #[wasm_bindgen(js_name = rowKeys)]
    pub fn row_keys(&self) -> js_sys::Array {
        self.registry
            .rows()
            .into_iter()
            .map(|row| JsValue::from_str(&row.key))
            .collect()
    }

    /// The active configuration
    #[wasm_bindgen]
    pub fn config(&self) -> std::result::Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(self.config.as_ref()).map_err(CheckError::from)?)
    }
}

/// The default configuration, as a plain object
#[wasm_bindgen]
pub fn default_config() -> std::result::Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(&CheckConfig::default()).map_err(CheckError::from)?)
}
